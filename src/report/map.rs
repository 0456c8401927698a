use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use crate::error::PipelineError;
use crate::models::{
    ClusterId, JoinedRegion, PolygonRings, Ring, RiskTier, INCOMPLETE_LABEL, INCOMPLETE_RGB,
};
use crate::report::{ensure_parent, rgb};
use crate::risk::tiers_for_rows;

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 1000;

/// What the map ended up showing.
#[derive(Debug, Clone)]
pub struct MapSummary {
    pub severity_field: Option<String>,
    pub tiers: BTreeMap<ClusterId, RiskTier>,
    pub legend: Vec<(String, (u8, u8, u8))>,
    pub incomplete_regions: usize,
}

/// Tier of a joined row, if its cluster was ranked.
fn tier_of(row: &JoinedRegion, tiers: &BTreeMap<ClusterId, RiskTier>) -> Option<RiskTier> {
    row.cluster().and_then(|c| tiers.get(&c).copied())
}

/// Legend entries: present tiers in High/Medium/Low order, then the gray
/// incomplete-data entry when any region is drawn gray.
pub fn legend_entries(
    rows: &[JoinedRegion],
    tiers: &BTreeMap<ClusterId, RiskTier>,
) -> Vec<(String, (u8, u8, u8))> {
    let mut entries: Vec<(String, (u8, u8, u8))> = RiskTier::ALL
        .iter()
        .filter(|t| tiers.values().any(|v| v == *t))
        .map(|t| (t.label().to_string(), t.rgb()))
        .collect();

    if rows.iter().any(|r| tier_of(r, tiers).is_none()) {
        entries.push((INCOMPLETE_LABEL.to_string(), INCOMPLETE_RGB));
    }
    entries
}

/// Rank the clusters visible on the map and compute what to draw.
///
/// Tiers are recomputed from the joined rows on every call.
pub fn summarize(rows: &[JoinedRegion], indicators: &[String]) -> MapSummary {
    let ranked = tiers_for_rows(
        rows.iter()
            .filter_map(|r| r.matched.as_ref().map(|(record, c)| (Some(*c), record))),
        indicators,
    );
    let (severity_field, tiers) = match ranked {
        Some((field, tiers)) => (Some(field), tiers),
        None => (None, BTreeMap::new()),
    };

    MapSummary {
        legend: legend_entries(rows, &tiers),
        incomplete_regions: rows.iter().filter(|r| tier_of(r, &tiers).is_none()).count(),
        severity_field,
        tiers,
    }
}

/// Rows with holes come first, so enclaved regions drawn afterwards cover
/// the holes cut for them.
pub fn draw_order(rows: &[JoinedRegion]) -> Vec<&JoinedRegion> {
    let (holed, plain): (Vec<&JoinedRegion>, Vec<&JoinedRegion>) =
        rows.iter().partition(|r| r.boundary.geometry.has_holes());
    holed.into_iter().chain(plain).collect()
}

/// Fills for one polygon: the exterior in `fill`, then each hole in white.
pub fn fill_layers(polygon: &PolygonRings, fill: RGBColor) -> Vec<(&Ring, RGBColor)> {
    polygon
        .iter()
        .enumerate()
        .map(|(i, ring)| (ring, if i == 0 { fill } else { WHITE }))
        .collect()
}

/// Combined bounds of every row that has geometry.
pub fn drawable_bounds(rows: &[JoinedRegion]) -> Option<(f64, f64, f64, f64)> {
    rows.iter()
        .filter_map(|r| r.boundary.geometry.bounds())
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
}

/// Render the choropleth to a PNG file.
pub fn render(
    rows: &[JoinedRegion],
    indicators: &[String],
    province: &str,
    output_path: &Path,
) -> Result<MapSummary> {
    let summary = summarize(rows, indicators);

    let (min_x, min_y, max_x, max_y) = drawable_bounds(rows)
        .ok_or_else(|| PipelineError::Geometry("no drawable boundary geometry".to_string()))?;

    // Keep degrees square so the province is not stretched.
    let pad = ((max_x - min_x).max(max_y - min_y) * 0.02).max(1e-6);
    let (x_range, y_range) = (min_x - pad..max_x + pad, min_y - pad..max_y + pad);
    let aspect = (x_range.end - x_range.start) / (y_range.end - y_range.start);
    let (width, height) = if aspect >= WIDTH as f64 / HEIGHT as f64 {
        (WIDTH, ((WIDTH as f64 / aspect) as u32).max(200) + 80)
    } else {
        (((HEIGHT as f64 * aspect) as u32).max(200), HEIGHT + 80)
    };

    ensure_parent(output_path)?;
    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Peta Risiko Bencana: {}", province),
            ("sans-serif", 32).into_font().style(FontStyle::Bold),
        )
        .margin(20)
        .build_cartesian_2d(x_range, y_range)?;

    for row in draw_order(rows) {
        let fill = match tier_of(row, &summary.tiers) {
            Some(tier) => rgb(tier.rgb()),
            None => rgb(INCOMPLETE_RGB),
        };
        for polygon in row.boundary.geometry.polygons() {
            for (ring, color) in fill_layers(polygon, fill) {
                chart.draw_series(std::iter::once(Polygon::new(ring.clone(), color.filled())))?;
            }
            for ring in polygon {
                chart.draw_series(std::iter::once(PathElement::new(
                    ring.clone(),
                    BLACK.stroke_width(1),
                )))?;
            }
        }
    }

    for (label, color) in &summary.legend {
        let color = rgb(*color);
        chart
            .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
            .label(label.as_str())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 7), (x + 16, y + 7)], color.filled())
            });
    }

    if !summary.legend.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.9))
            .border_style(&BLACK)
            .label_font(("sans-serif", 16))
            .draw()?;
    }

    root.present()?;
    Ok(summary)
}
