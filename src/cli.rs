use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "riskmap",
    about = "Cluster regional disaster statistics and map the resulting risk tiers",
    version
)]
pub struct Cli {
    /// Pipeline config file [default: ./.riskmap/config.toml, fallback ~/.config/riskmap/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the indicator tables and boundary file
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for the rendered map and scatter images
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Province to map, matched against the boundary province field
    #[arg(long)]
    pub province: Option<String>,

    /// Number of clusters
    #[arg(long, value_name = "K")]
    pub clusters: Option<usize>,

    /// Random seed for k-means
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the existing aggregated table instead of rebuilding it
    #[arg(long, conflicts_with = "aggregate_only")]
    pub skip_aggregate: bool,

    /// Only rebuild the aggregated table, then stop
    #[arg(long)]
    pub aggregate_only: bool,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Show skipped sources, PCA variance and k-means inertia
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}
