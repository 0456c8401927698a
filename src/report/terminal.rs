use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::cluster::metrics::ValidationScores;
use crate::cluster::profile::{ClusterProfile, Priority};
use crate::models::RiskTier;
use crate::report::RunSummary;

const BOX_WIDTH: usize = 48;

/// Render a colored terminal report.
pub fn render(summary: &RunSummary, verbose: bool, quiet: bool) {
    if quiet {
        let (high, medium, low) = tier_counts(summary);
        println!(
            "Regions: {}  Clusters: {}  High: {}  Medium: {}  Low: {}  Incomplete: {}",
            summary.regions,
            summary.clusters,
            high.to_string().red(),
            medium.to_string().yellow(),
            low.to_string().green(),
            summary.incomplete_regions,
        );
        return;
    }

    println!("\n {} v{}", "riskmap".bold(), env!("CARGO_PKG_VERSION"));
    println!(" Province: {}\n", summary.province);

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<w$} │", "SUMMARY".bold(), w = BOX_WIDTH);
    for line in summary_lines(summary) {
        println!(" │  {:<w$} │", line, w = BOX_WIDTH);
    }
    println!(" └────────────────────────────────────────────────────┘\n");

    match &summary.scores {
        Some(scores) => {
            println!(" {} Cluster validation:\n", "[METRICS]".cyan().bold());
            println!("{}\n", metrics_table(scores));
        }
        None => println!(
            " {} Validation skipped: fewer than two clusters\n",
            "[METRICS]".yellow().bold()
        ),
    }

    if !summary.profiles.is_empty() {
        println!(" {} Cluster profiles:\n", "[PROFILE]".cyan().bold());
        println!("{}\n", profile_table(summary));
        render_recommendations(&summary.profiles);
    }

    if !summary.warnings.is_empty() {
        println!(" {} Warnings:\n", "[WARN]".yellow().bold());
        for warning in &summary.warnings {
            println!("   {} {}", "⚠".yellow(), warning);
        }
        println!();
    }

    if !summary.outputs.is_empty() {
        println!(" {} Outputs:", "[OUT]".cyan().bold());
        for path in &summary.outputs {
            println!("   {}", path.display());
        }
        println!();
    }

    if verbose {
        println!(
            " {} PCA explained variance: PC1 {:.1}%  PC2 {:.1}%",
            "[PCA]".cyan().bold(),
            summary.explained_variance[0] * 100.0,
            summary.explained_variance[1] * 100.0
        );
        println!(" {} k-means inertia: {:.3}\n", "[KMEANS]".cyan().bold(), summary.inertia);
    }
}

/// Rows of the summary box.
fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let configured = summary.features.len() + summary.missing_features.len();
    let severity = summary.severity_field.as_deref().unwrap_or("none");
    vec![
        format!("Regions clustered  : {}", summary.regions),
        format!("Boundary regions   : {}", summary.boundary_rows),
        format!("Clusters (k)       : {}", summary.clusters),
        format!("Features used      : {}/{}", summary.features.len(), configured),
        format!("Severity field     : {}", severity),
        format!("Incomplete regions : {}", summary.incomplete_regions),
    ]
}

fn tier_counts(summary: &RunSummary) -> (usize, usize, usize) {
    let count = |tier: RiskTier| {
        summary
            .profiles
            .iter()
            .filter(|p| summary.tiers.get(&p.cluster) == Some(&tier))
            .map(|p| p.size)
            .sum::<usize>()
    };
    (count(RiskTier::High), count(RiskTier::Medium), count(RiskTier::Low))
}

/// Human reading of a silhouette score.
pub fn silhouette_verdict(score: f64) -> &'static str {
    if score > 0.5 {
        "well separated"
    } else if score > 0.25 {
        "reasonable structure"
    } else {
        "weak structure"
    }
}

fn metrics_table(scores: &ValidationScores) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Score").add_attribute(Attribute::Bold),
            Cell::new("Reading").add_attribute(Attribute::Bold),
        ]);

    let silhouette_color = if scores.silhouette > 0.5 {
        Color::Green
    } else if scores.silhouette > 0.25 {
        Color::Yellow
    } else {
        Color::Red
    };

    table.add_row(vec![
        Cell::new("Silhouette"),
        Cell::new(format!("{:.4}", scores.silhouette)).set_alignment(CellAlignment::Right),
        Cell::new(silhouette_verdict(scores.silhouette)).fg(silhouette_color),
    ]);
    table.add_row(vec![
        Cell::new("Davies-Bouldin"),
        Cell::new(format!("{:.4}", scores.davies_bouldin)).set_alignment(CellAlignment::Right),
        Cell::new("lower is better"),
    ]);
    table.add_row(vec![
        Cell::new("Calinski-Harabasz"),
        Cell::new(format!("{:.2}", scores.calinski_harabasz)).set_alignment(CellAlignment::Right),
        Cell::new("higher is better"),
    ]);
    table
}

fn profile_table(summary: &RunSummary) -> Table {
    let mut header = vec![
        Cell::new("Cluster").add_attribute(Attribute::Bold),
        Cell::new("Size").add_attribute(Attribute::Bold),
    ];
    header.extend(
        summary
            .features
            .iter()
            .map(|f| Cell::new(f).add_attribute(Attribute::Bold)),
    );
    header.push(Cell::new("Tier").add_attribute(Attribute::Bold));
    header.push(Cell::new("Priority").add_attribute(Attribute::Bold));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for profile in &summary.profiles {
        let mut row = vec![
            Cell::new(profile.cluster).set_alignment(CellAlignment::Center),
            Cell::new(profile.size).set_alignment(CellAlignment::Right),
        ];
        row.extend(profile.means.iter().map(|m| {
            let text = m.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string());
            Cell::new(text).set_alignment(CellAlignment::Right)
        }));

        let tier = match summary.tiers.get(&profile.cluster) {
            Some(RiskTier::High) => Cell::new("HIGH").fg(Color::Red),
            Some(RiskTier::Medium) => Cell::new("MEDIUM").fg(Color::Yellow),
            Some(RiskTier::Low) => Cell::new("LOW").fg(Color::Green),
            None => Cell::new("-").fg(Color::DarkGrey),
        };
        row.push(tier);

        let priority_color = match profile.priority {
            Priority::High => Color::Red,
            Priority::LowMedium => Color::Green,
        };
        row.push(Cell::new(profile.priority.to_string()).fg(priority_color));
        table.add_row(row);
    }
    table
}

fn render_recommendations(profiles: &[ClusterProfile]) {
    println!(" {} Recommendations:\n", "[ACTION]".cyan().bold());
    for profile in profiles {
        let marker = match profile.priority {
            Priority::High => "✗".red(),
            Priority::LowMedium => "✓".green(),
        };
        println!(
            "   {} Cluster {}: {} ({})",
            marker,
            profile.cluster,
            profile.priority.recommendation(),
            profile.priority
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            province: "JawaBarat".into(),
            regions: 5,
            clusters: 2,
            features: vec!["rumah_jumlah_kerusakan".into()],
            profiles: vec![
                ClusterProfile {
                    cluster: 0,
                    size: 3,
                    means: vec![Some(1.0)],
                    priority: Priority::LowMedium,
                },
                ClusterProfile { cluster: 1, size: 2, means: vec![None], priority: Priority::High },
            ],
            tiers: BTreeMap::from([(0, RiskTier::Low), (1, RiskTier::High)]),
            ..RunSummary::default()
        }
    }

    #[test]
    fn test_silhouette_verdict() {
        assert_eq!(silhouette_verdict(0.7), "well separated");
        assert_eq!(silhouette_verdict(0.3), "reasonable structure");
        assert_eq!(silhouette_verdict(0.1), "weak structure");
    }

    #[test]
    fn test_summary_lines_fit_the_box() {
        let mut summary = summary();
        summary.missing_features = vec!["gempa_n".into()];
        summary.severity_field = Some("rumah_jumlah_kerusakan".into());

        let lines = summary_lines(&summary);
        assert!(lines.contains(&"Features used      : 1/2".to_string()));
        assert!(lines.contains(&"Severity field     : rumah_jumlah_kerusakan".to_string()));
        assert!(lines.iter().all(|l| l.chars().count() <= BOX_WIDTH));
    }

    #[test]
    fn test_tier_counts_weight_by_cluster_size() {
        assert_eq!(tier_counts(&summary()), (2, 0, 3));
    }

    #[test]
    fn test_profile_table_has_a_row_per_cluster() {
        let rendered = profile_table(&summary()).to_string();
        assert!(rendered.contains("rumah_jumlah_kerusakan"));
        assert!(rendered.contains("LOW/MEDIUM"));
        assert!(rendered.contains("HIGH"));
        assert!(rendered.contains("1.00"));
    }

    #[test]
    fn test_metrics_table_lists_three_scores() {
        let scores =
            ValidationScores { silhouette: 0.61, davies_bouldin: 0.4, calinski_harabasz: 120.0 };
        let rendered = metrics_table(&scores).to_string();
        assert!(rendered.contains("Silhouette"));
        assert!(rendered.contains("0.6100"));
        assert!(rendered.contains("120.00"));
    }
}
