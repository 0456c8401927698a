//! Renderers for pipeline results.
//!
//! - [`terminal`]: colored metrics, cluster profile table and join summary;
//!   respects `--verbose` / `--quiet`.
//! - [`map`]: choropleth PNG of the province colored by risk tier.
//! - [`scatter`]: PCA scatter PNG with the legend outside the plot area.

pub mod map;
pub mod scatter;
pub mod terminal;

use std::collections::BTreeMap;
use std::path::PathBuf;

use plotters::style::RGBColor;
use serde::Serialize;

use crate::cluster::metrics::ValidationScores;
use crate::cluster::profile::ClusterProfile;
use crate::models::{ClusterId, RiskTier};

/// Everything a run produced, for the terminal and JSON reports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub province: String,
    pub regions: usize,
    pub codes_resolved: bool,
    pub features: Vec<String>,
    pub missing_features: Vec<String>,
    pub clusters: usize,
    pub inertia: f64,
    /// `None` when fewer than two clusters were found.
    pub scores: Option<ValidationScores>,
    pub profiles: Vec<ClusterProfile>,
    pub severity_field: Option<String>,
    pub tiers: BTreeMap<ClusterId, RiskTier>,
    pub boundary_rows: usize,
    pub incomplete_regions: usize,
    pub explained_variance: [f64; 2],
    pub warnings: Vec<String>,
    pub outputs: Vec<PathBuf>,
}

pub(crate) fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

/// Create the parent directory of an output file.
pub(crate) fn ensure_parent(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
