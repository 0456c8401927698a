use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::config::SourceSpec;
use crate::ingest::{read_csv, RawTable};
use crate::normalize::key::normalize_strip_kota;

/// One source category reduced to per-key sums.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    /// Output column names, already prefixed with `{category}_`.
    pub columns: Vec<String>,
    pub sums: BTreeMap<String, Vec<f64>>,
}

/// The merged wide table, keyed by strip-KOTA key in sorted order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregated {
    pub columns: Vec<String>,
    pub rows: BTreeMap<String, Vec<f64>>,
}

/// Result of an aggregation run, including what was skipped along the way.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    pub table: Option<Aggregated>,
    pub missing: Vec<PathBuf>,
    pub no_region_column: Vec<PathBuf>,
}

/// First column whose name mentions `nama_kab` or `kota`.
pub fn detect_region_column(headers: &[String]) -> Result<Option<usize>> {
    let re = Regex::new(r"(?i)nama_kab|kota")?;
    Ok(headers.iter().position(|h| re.is_match(h)))
}

/// Numeric columns that are neither the region column nor year/code columns.
pub fn indicator_columns(table: &RawTable, region_col: usize) -> Result<Vec<usize>> {
    let excluded = Regex::new(r"(?i)tahun|kode")?;
    Ok((0..table.headers.len())
        .filter(|&c| c != region_col)
        .filter(|&c| !excluded.is_match(&table.headers[c]))
        .filter(|&c| table.is_numeric(c))
        .collect())
}

/// Sum every indicator per region key. `None` when the table has no region column.
pub fn summarize_source(category: &str, table: &RawTable) -> Result<Option<CategoryTable>> {
    let Some(region_col) = detect_region_column(&table.headers)? else {
        return Ok(None);
    };
    let indicators = indicator_columns(table, region_col)?;

    let mut sums: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in 0..table.rows.len() {
        if table.is_missing(row, region_col) {
            continue;
        }
        let key = normalize_strip_kota(Some(table.cell(row, region_col).trim()));
        let acc = sums
            .entry(key)
            .or_insert_with(|| vec![0.0; indicators.len()]);
        for (slot, &col) in acc.iter_mut().zip(&indicators) {
            *slot += table.number(row, col).unwrap_or(0.0);
        }
    }

    Ok(Some(CategoryTable {
        columns: indicators
            .iter()
            .map(|&c| format!("{}_{}", category, table.headers[c]))
            .collect(),
        sums,
    }))
}

/// Outer-merge category tables on their key and zero-fill the gaps.
pub fn merge(tables: &[CategoryTable]) -> Aggregated {
    let keys: BTreeSet<&String> = tables.iter().flat_map(|t| t.sums.keys()).collect();
    let columns: Vec<String> = tables.iter().flat_map(|t| t.columns.clone()).collect();

    let rows = keys
        .into_iter()
        .map(|key| {
            let values = tables
                .iter()
                .flat_map(|t| match t.sums.get(key) {
                    Some(v) => v.clone(),
                    None => vec![0.0; t.columns.len()],
                })
                .collect();
            (key.clone(), values)
        })
        .collect();

    Aggregated { columns, rows }
}

/// Read every configured source under `data_dir` and merge what is usable.
pub fn aggregate_sources(data_dir: &Path, sources: &[SourceSpec]) -> Result<AggregationOutcome> {
    let mut outcome = AggregationOutcome::default();
    let mut tables = Vec::new();

    for source in sources {
        let path = data_dir.join(&source.file);
        if !path.exists() {
            outcome.missing.push(path);
            continue;
        }
        let raw = read_csv(&path)?;
        match summarize_source(&source.category, &raw)
            .with_context(|| format!("aggregating {}", path.display()))?
        {
            Some(table) => tables.push(table),
            None => outcome.no_region_column.push(path),
        }
    }

    if !tables.is_empty() {
        outcome.table = Some(merge(&tables));
    }
    Ok(outcome)
}

/// Write the aggregated table with the region name as first column,
/// headed `region_column`.
pub fn write_csv(table: &Aggregated, region_column: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![region_column.to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for (key, values) in &table.rows {
        let mut record = vec![key.clone()];
        record.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
