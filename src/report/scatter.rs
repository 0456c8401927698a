use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use crate::cluster::pca::Projection;
use crate::models::{ClusterId, RiskTier, StatsTable, INCOMPLETE_RGB};
use crate::report::{ensure_parent, rgb};
use crate::risk::tiers_for_rows;

const WIDTH: u32 = 1300;
const HEIGHT: u32 = 800;
const PLOT_WIDTH: i32 = 1020;
const POINT_RADIUS: i32 = 10;

pub const UNKNOWN_LABEL: &str = "Unknown";

/// Points sharing one legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterGroup {
    pub label: String,
    pub color: (u8, u8, u8),
    pub points: Vec<(f64, f64)>,
}

/// Group projected points by the risk tier of their cluster.
///
/// Tiers are ranked from the clustered table itself; points whose cluster
/// has no tier are grouped under "Unknown". Groups follow High/Medium/Low
/// order with "Unknown" last.
pub fn scatter_groups(
    projection: &Projection,
    labels: &[ClusterId],
    table: &StatsTable,
) -> Vec<ScatterGroup> {
    let tiers = tiers_for_rows(
        table.rows.iter().zip(labels).map(|(r, &c)| (Some(c), r)),
        &table.indicators,
    )
    .map(|(_, tiers)| tiers)
    .unwrap_or_default();

    let mut by_tier: Vec<(RiskTier, Vec<(f64, f64)>)> =
        RiskTier::ALL.iter().map(|t| (*t, Vec::new())).collect();
    let mut unknown = Vec::new();

    for (point, cluster) in projection.points.iter().zip(labels) {
        match tiers.get(cluster) {
            Some(tier) => {
                if let Some((_, bucket)) = by_tier.iter_mut().find(|(t, _)| t == tier) {
                    bucket.push(*point);
                }
            }
            None => unknown.push(*point),
        }
    }

    let mut groups: Vec<ScatterGroup> = by_tier
        .into_iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(tier, points)| ScatterGroup {
            label: tier.label().to_string(),
            color: tier.rgb(),
            points,
        })
        .collect();

    if !unknown.is_empty() {
        groups.push(ScatterGroup {
            label: UNKNOWN_LABEL.to_string(),
            color: INCOMPLETE_RGB,
            points: unknown,
        });
    }
    groups
}

fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return -1.0..1.0;
    }
    let pad = if hi - lo > 0.0 { (hi - lo) * 0.1 } else { 1.0 };
    lo - pad..hi + pad
}

/// Render the PCA scatter plot with the legend in a side panel.
pub fn render(
    projection: &Projection,
    labels: &[ClusterId],
    table: &StatsTable,
    output_path: &Path,
) -> Result<Vec<ScatterGroup>> {
    let groups = scatter_groups(projection, labels, table);

    ensure_parent(output_path)?;
    let root = BitMapBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot_area, legend_area) = root.split_horizontally(PLOT_WIDTH);

    let x_range = padded_range(projection.points.iter().map(|p| p.0));
    let y_range = padded_range(projection.points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(
            "Validasi Cluster (PCA Projection)",
            ("sans-serif", 28).into_font().style(FontStyle::Bold),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Principal Component 1")
        .y_desc("Principal Component 2")
        .bold_line_style(BLACK.mix(0.12))
        .light_line_style(TRANSPARENT)
        .draw()?;

    for group in &groups {
        let color = rgb(group.color);
        chart.draw_series(
            group
                .points
                .iter()
                .map(|p| Circle::new(*p, POINT_RADIUS, color.mix(0.9).filled())),
        )?;
        chart.draw_series(
            group
                .points
                .iter()
                .map(|p| Circle::new(*p, POINT_RADIUS, BLACK.stroke_width(1))),
        )?;
    }

    draw_legend(&legend_area, &groups)?;
    root.present()?;
    Ok(groups)
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    groups: &[ScatterGroup],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (left, top, row_h) = (12, 60, 30);
    let bottom = top + 40 + groups.len() as i32 * row_h;
    let (width, _) = area.dim_in_pixel();

    area.draw(&Rectangle::new(
        [(left - 6, top - 10), (width as i32 - 10, bottom)],
        BLACK.stroke_width(1),
    ))?;
    area.draw(&Text::new(
        "PROFIL RISIKO",
        (left, top),
        ("sans-serif", 18).into_font().style(FontStyle::Bold),
    ))?;

    for (i, group) in groups.iter().enumerate() {
        let y = top + 36 + i as i32 * row_h;
        let color = rgb(group.color);
        area.draw(&Rectangle::new([(left, y), (left + 16, y + 16)], color.filled()))?;
        area.draw(&Rectangle::new([(left, y), (left + 16, y + 16)], BLACK.stroke_width(1)))?;
        area.draw(&Text::new(
            group.label.clone(),
            (left + 24, y),
            ("sans-serif", 15).into_font(),
        ))?;
    }
    Ok(())
}
