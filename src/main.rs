//! `riskmap`: cluster regional disaster statistics and map the resulting risk tiers.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load the pipeline config
//!    ([`config::load_config`]), letting flags override it.
//! 2. Aggregate the raw indicator tables into one statistics CSV
//!    ([`ingest::aggregate`]) unless `--skip-aggregate`; stop here with
//!    `--aggregate-only`.
//! 3. Load the statistics ([`ingest::loader`]) and boundaries
//!    ([`ingest::geojson`]).
//! 4. Standardize and cluster ([`cluster::run_kmeans`]), then score the
//!    clustering ([`cluster::metrics`]) and profile each cluster
//!    ([`cluster::profile`]).
//! 5. Join the clusters onto the province boundaries ([`spatial`]).
//! 6. Render the choropleth and PCA scatter ([`report::map`],
//!    [`report::scatter`]).
//! 7. Print the terminal or JSON report ([`report`]).
//! 8. Exit `0`, or print `FATAL ERROR` and exit `1` on the first failure.

mod cli;
mod cluster;
mod config;
mod error;
mod ingest;
mod models;
mod normalize;
mod report;
mod risk;
mod spatial;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use cli::{Cli, ReportFormat};
use cluster::profile::cluster_profiles;
use cluster::{metrics, pca, run_kmeans, KMeansParams};
use config::{load_config, Config};
use error::PipelineError;
use ingest::aggregate::{aggregate_sources, write_csv};
use ingest::geojson::load_boundaries;
use ingest::loader::load_stats;
use normalize::codes;
use report::{map, scatter, RunSummary};
use spatial::{spatial_join, JoinSettings};

/// Stages after aggregation: load stats, load boundaries, cluster,
/// evaluate, join, map, scatter.
const ANALYSIS_STAGES: u64 = 7;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("{} {:#}", "FATAL ERROR:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let working_dir = std::env::current_dir()?;
    let mut config = load_config(&working_dir, cli.config.as_deref())?;
    apply_overrides(&mut config, cli);

    let stages = match (cli.skip_aggregate, cli.aggregate_only) {
        (true, _) => ANALYSIS_STAGES,
        (false, true) => 1,
        (false, false) => ANALYSIS_STAGES + 1,
    };
    let pb = stage_bar(cli.quiet, stages)?;
    let mut warnings: Vec<String> = Vec::new();

    if !cli.skip_aggregate {
        pb.set_message("aggregating indicator tables");
        let written = aggregate_stage(&config, cli, &pb, &mut warnings)?;
        pb.inc(1);

        if cli.aggregate_only {
            pb.finish_and_clear();
            print_warnings(&warnings, cli.quiet);
            if !written {
                bail!(
                    "no usable indicator tables found in {}",
                    config.paths.data_dir.display()
                );
            }
            if !cli.quiet {
                eprintln!("{} Aggregation complete.", "✓".green().bold());
            }
            return Ok(());
        }
    }

    // Load
    pb.set_message("loading statistics");
    let loaded = load_stats(&config.paths.stats_path(), &config.analysis.region_column)
        .context("loading aggregated statistics")?;
    if loaded.codes_resolved {
        status(
            &pb,
            cli.quiet,
            format!("region codes resolved to {} region names", codes::PROVINCE),
        );
    }
    let table = loaded.table;
    status(&pb, cli.quiet, format!("{} regions loaded", table.rows.len()));
    pb.inc(1);

    pb.set_message("loading boundaries");
    let boundaries =
        load_boundaries(&config.paths.boundary_path()).context("loading boundary file")?;
    status(&pb, cli.quiet, format!("{} boundary features loaded", boundaries.len()));
    pb.inc(1);

    // Cluster
    pb.set_message("clustering");
    let params = KMeansParams {
        k: config.analysis.clusters,
        seed: config.analysis.seed,
        restarts: config.analysis.restarts,
    };
    let clustered =
        run_kmeans(&table, &config.analysis.features, params).context("clustering regions")?;
    if !clustered.missing_features.is_empty() {
        warnings.push(format!(
            "features not in statistics table: {}",
            clustered.missing_features.join(", ")
        ));
    }
    pb.inc(1);

    pb.set_message("evaluating clusters");
    let scores = match metrics::evaluate(&clustered.scaled, &clustered.labels) {
        Ok(scores) => Some(scores),
        Err(err @ PipelineError::InsufficientClusters { .. }) => {
            warnings.push(err.to_string());
            None
        }
        Err(err) => return Err(err).context("evaluating clusters"),
    };
    let profiles = cluster_profiles(&table, &clustered.labels, &clustered.features);
    pb.inc(1);

    // Join
    pb.set_message("joining boundaries");
    let settings = JoinSettings {
        province: &config.analysis.target_province,
        province_field: &config.boundary.province_field,
        region_field: &config.boundary.region_field,
        split_regions: &config.split_regions,
        simplify_tolerance: config.boundary.simplify_tolerance,
    };
    let joined = spatial_join(boundaries, &table, &clustered.labels, &settings)
        .context("joining statistics to boundaries")?;
    warnings.extend(joined.warnings.iter().map(ToString::to_string));
    pb.inc(1);

    // Render
    pb.set_message("rendering risk map");
    let map_path = config.paths.map_path();
    let map_summary = map::render(
        &joined.rows,
        &table.indicators,
        &config.analysis.target_province,
        &map_path,
    )
    .context("rendering risk map")?;
    if map_summary.severity_field.is_none() {
        warnings.push(
            "no damage column in statistics; every region is drawn as incomplete data".to_string(),
        );
    }
    status(&pb, cli.quiet, format!("map written to {}", map_path.display()));
    pb.inc(1);

    pb.set_message("rendering PCA scatter");
    let projection = pca::project_2d(&clustered.scaled).context("projecting clusters")?;
    let scatter_path = config.paths.scatter_path();
    scatter::render(&projection, &clustered.labels, &table, &scatter_path)
        .context("rendering PCA scatter")?;
    status(&pb, cli.quiet, format!("scatter written to {}", scatter_path.display()));
    pb.inc(1);
    pb.finish_and_clear();

    let summary = RunSummary {
        province: config.analysis.target_province.clone(),
        regions: table.rows.len(),
        codes_resolved: loaded.codes_resolved,
        features: clustered.features,
        missing_features: clustered.missing_features,
        clusters: config.analysis.clusters,
        inertia: clustered.inertia,
        scores,
        profiles,
        severity_field: map_summary.severity_field,
        tiers: map_summary.tiers,
        boundary_rows: joined.rows.len(),
        incomplete_regions: map_summary.incomplete_regions,
        explained_variance: projection.explained_variance_ratio,
        warnings,
        outputs: vec![config.paths.stats_path(), map_path, scatter_path],
    };

    match cli.report {
        ReportFormat::Terminal => report::terminal::render(&summary, cli.verbose, cli.quiet),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if !cli.quiet {
        eprintln!("{} Analysis complete.", "✓".green().bold());
    }
    Ok(())
}

/// Rebuild the aggregated statistics CSV. Returns whether a table was written.
fn aggregate_stage(
    config: &Config,
    cli: &Cli,
    pb: &ProgressBar,
    warnings: &mut Vec<String>,
) -> Result<bool> {
    let outcome = aggregate_sources(&config.paths.data_dir, &config.sources)?;

    for path in &outcome.missing {
        warnings.push(format!("source file not found, skipped: {}", path.display()));
    }
    if cli.verbose {
        for path in &outcome.no_region_column {
            status(pb, cli.quiet, format!("no region column, skipped: {}", path.display()));
        }
    }

    let Some(table) = &outcome.table else {
        warnings.push(
            "no usable indicator tables; keeping the existing statistics file".to_string(),
        );
        return Ok(false);
    };

    let stats_path = config.paths.stats_path();
    write_csv(table, &config.analysis.region_column, &stats_path)?;
    status(
        pb,
        cli.quiet,
        format!(
            "{} regions x {} indicators written to {}",
            table.rows.len(),
            table.columns.len(),
            stats_path.display()
        ),
    );
    Ok(true)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.paths.output_dir = dir.clone();
    }
    if let Some(province) = &cli.province {
        config.analysis.target_province = province.clone();
    }
    if let Some(k) = cli.clusters {
        config.analysis.clusters = k;
    }
    if let Some(seed) = cli.seed {
        config.analysis.seed = seed;
    }
}

fn stage_bar(quiet: bool, stages: u64) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(stages);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn status(pb: &ProgressBar, quiet: bool, message: impl std::fmt::Display) {
    if !quiet {
        pb.suspend(|| eprintln!("  {} {}", "→".cyan(), message));
    }
}

fn print_warnings(warnings: &[String], quiet: bool) {
    if quiet {
        return;
    }
    for warning in warnings {
        eprintln!("  {} {}", "⚠".yellow(), warning);
    }
}
