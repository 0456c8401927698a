//! Input readers.
//!
//! - [`aggregate`]: merges the raw per-category indicator tables into the
//!   wide statistics table.
//! - [`loader`]: reads the statistics table back, resolving numeric region codes.
//! - [`geojson`]: reads the boundary FeatureCollection.

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::PipelineError;

pub mod aggregate;
pub mod geojson;
pub mod loader;

/// A CSV file held as text cells, addressed by column name.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether the cell holds nothing or one of the [`NA_TOKENS`].
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        is_na(self.cell(row, col))
    }

    /// A column is numeric when every non-missing cell parses as `f64`.
    pub fn is_numeric(&self, col: usize) -> bool {
        (0..self.rows.len())
            .filter(|&r| !self.is_missing(r, col))
            .all(|r| self.cell(r, col).trim().parse::<f64>().is_ok())
    }

    /// Parsed value of a numeric cell. Missing, unparsable and NaN cells
    /// are `None`.
    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        if self.is_missing(row, col) {
            return None;
        }
        self.cell(row, col)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
    }
}

/// Cell spellings that mean "no value" in exported statistics tables.
pub const NA_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na(cell: &str) -> bool {
    NA_TOKENS.contains(&cell.trim())
}

/// Read a headed CSV file. Short rows are padded with empty cells.
pub fn read_csv(path: &Path) -> Result<RawTable> {
    if !path.exists() {
        return Err(PipelineError::MissingFile(path.to_path_buf()).into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("parsing {}", path.display()))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}
