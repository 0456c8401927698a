use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the pipeline stages.
///
/// Everything except [`PipelineError::InsufficientClusters`] aborts the run;
/// that one is downgraded to a warning by the evaluation stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing input file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("column `{column}` not found in {table}")]
    MissingColumn { table: String, column: String },

    #[error("no matching feature columns found (wanted: {})", .wanted.join(", "))]
    NoFeatureMatch { wanted: Vec<String> },

    #[error("province '{0}' not found in boundary data")]
    EmptyFilterResult(String),

    #[error("not enough clusters for evaluation ({found} found, at least 2 required)")]
    InsufficientClusters { found: usize },

    #[error("cannot form {k} clusters from {rows} rows")]
    InvalidClusterCount { k: usize, rows: usize },

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("invalid geometry: {0}")]
    Geometry(String),
}
