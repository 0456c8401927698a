use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::error::PipelineError;
use crate::ingest::{read_csv, RawTable};
use crate::models::{RegionRecord, StatsTable};
use crate::normalize::codes::resolve_code_cell;

/// The statistics table plus whether its region column held numeric codes.
#[derive(Debug)]
pub struct LoadedStats {
    pub table: StatsTable,
    pub codes_resolved: bool,
}

/// Load the aggregated statistics CSV.
///
/// When every non-empty cell of `region_column` is a number, the cells are
/// treated as BPS codes and replaced by region names; unknown codes become
/// empty names.
pub fn load_stats(path: &Path, region_column: &str) -> Result<LoadedStats> {
    let raw = read_csv(path)?;
    stats_from_raw(&raw, region_column, &path.display().to_string())
}

pub fn stats_from_raw(raw: &RawTable, region_column: &str, source: &str) -> Result<LoadedStats> {
    let region_col = raw
        .column_index(region_column)
        .ok_or_else(|| PipelineError::MissingColumn {
            table: source.to_string(),
            column: region_column.to_string(),
        })?;

    let codes_resolved = (0..raw.rows.len()).any(|r| !raw.is_missing(r, region_col))
        && raw.is_numeric(region_col);

    let indicator_cols: Vec<usize> = (0..raw.headers.len())
        .filter(|&c| c != region_col && raw.is_numeric(c))
        .collect();

    let rows = (0..raw.rows.len())
        .map(|r| {
            let cell = raw.cell(r, region_col);
            let name = if codes_resolved {
                resolve_code_cell(cell)
            } else {
                cell.to_string()
            };
            let values: BTreeMap<String, f64> = indicator_cols
                .iter()
                .filter_map(|&c| raw.number(r, c).map(|v| (raw.headers[c].clone(), v)))
                .collect();
            RegionRecord::new(name, values)
        })
        .collect();

    Ok(LoadedStats {
        table: StatsTable {
            region_column: region_column.to_string(),
            indicators: indicator_cols.iter().map(|&c| raw.headers[c].clone()).collect(),
            rows,
        },
        codes_resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_text_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agg.csv");
        std::fs::write(
            &path,
            "nama_kabupaten_kota,rumah_jumlah_kerusakan,banjir_n\nKOTA DEPOK,4,\nGARUT,1,2\n",
        )
        .unwrap();

        let loaded = load_stats(&path, "nama_kabupaten_kota").unwrap();
        assert!(!loaded.codes_resolved);
        let table = loaded.table;
        assert_eq!(table.indicators, vec!["rumah_jumlah_kerusakan", "banjir_n"]);
        assert_eq!(table.rows[0].name, "KOTA DEPOK");
        assert_eq!(table.rows[0].key, "DEPOK");
        assert_eq!(table.rows[0].value("banjir_n"), None);
        assert_eq!(table.rows[1].value("banjir_n"), Some(2.0));
    }

    #[test]
    fn test_numeric_region_codes_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agg.csv");
        std::fs::write(&path, "nama_kabupaten_kota,n\n3273,1\n3299,2\n").unwrap();

        let loaded = load_stats(&path, "nama_kabupaten_kota").unwrap();
        assert!(loaded.codes_resolved);
        assert_eq!(loaded.table.indicators, vec!["n"]);
        assert_eq!(loaded.table.rows[0].name, "KOTA BANDUNG");
        assert_eq!(loaded.table.rows[0].key, "KOTABANDUNG");
        assert_eq!(loaded.table.rows[1].name, "");
    }

    #[test]
    fn test_na_cells_keep_indicator_numeric() {
        let raw = RawTable {
            headers: vec!["nama_kabupaten_kota".into(), "rumah".into(), "banjir".into()],
            rows: vec![
                vec!["A".into(), "NaN".into(), "1".into()],
                vec!["B".into(), "5".into(), "NA".into()],
                vec!["C".into(), "9".into(), "3".into()],
            ],
        };
        let table = stats_from_raw(&raw, "nama_kabupaten_kota", "agg.csv").unwrap().table;
        assert_eq!(table.indicators, vec!["rumah", "banjir"]);
        assert_eq!(table.rows[0].value("rumah"), None);
        assert_eq!(table.rows[1].value("banjir"), None);
        assert_eq!(table.rows[2].value("rumah"), Some(9.0));
    }

    #[test]
    fn test_missing_region_column() {
        let raw = RawTable {
            headers: vec!["kota".into()],
            rows: vec![],
        };
        let err = stats_from_raw(&raw, "nama_kabupaten_kota", "agg.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { .. })
        ));
    }
}
