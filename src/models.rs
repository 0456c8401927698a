use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::normalize::key::normalize_retain_kota;

/// Cluster identifier produced by k-means, in `0..k`.
pub type ClusterId = usize;

/// One region (regency or city) with its aggregated indicator values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub name: String,
    /// Boundary join key, always `normalize_retain_kota(name)`.
    pub key: String,
    /// Indicator name to value. An absent entry is a missing value.
    pub values: BTreeMap<String, f64>,
}

impl RegionRecord {
    pub fn new(name: impl Into<String>, values: BTreeMap<String, f64>) -> Self {
        let name = name.into();
        let key = normalize_retain_kota(Some(name.as_str()));
        Self { name, key, values }
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }
}

/// The aggregated statistics table: one [`RegionRecord`] per row, in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsTable {
    pub region_column: String,
    pub indicators: Vec<String>,
    pub rows: Vec<RegionRecord>,
}

impl StatsTable {
    pub fn has_indicator(&self, name: &str) -> bool {
        self.indicators.iter().any(|c| c == name)
    }
}

/// Qualitative risk level derived from ranking clusters by mean severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    /// Legend order.
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            RiskTier::High => (0xFF, 0x00, 0x00),
            RiskTier::Medium => (0xFF, 0xD7, 0x00),
            RiskTier::Low => (0x22, 0x8B, 0x22),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::High => "RISIKO TINGGI (Prioritas)",
            RiskTier::Medium => "RISIKO SEDANG (Waspada)",
            RiskTier::Low => "RISIKO RENDAH (Monitor)",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::High => write!(f, "High"),
            RiskTier::Medium => write!(f, "Medium"),
            RiskTier::Low => write!(f, "Low"),
        }
    }
}

/// Fill color for regions without a tier.
pub const INCOMPLETE_RGB: (u8, u8, u8) = (0xD3, 0xD3, 0xD3);
pub const INCOMPLETE_LABEL: &str = "Data Tidak Lengkap";

/// A closed ring of `(lon, lat)` positions.
pub type Ring = Vec<(f64, f64)>;

/// A polygon as its exterior ring followed by any holes.
pub type PolygonRings = Vec<Ring>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

impl Geometry {
    /// Placeholder for features whose geometry is null or not polygonal.
    pub fn empty() -> Self {
        Geometry::MultiPolygon(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.polygons().iter().all(|p| p.iter().all(|r| r.is_empty()))
    }

    /// Whether any polygon carries interior rings.
    pub fn has_holes(&self) -> bool {
        self.polygons().iter().any(|p| p.len() > 1)
    }

    pub fn polygons(&self) -> Vec<&PolygonRings> {
        match self {
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(ps) => ps.iter().collect(),
        }
    }

    /// `(min_lon, min_lat, max_lon, max_lat)`, or `None` for an empty geometry.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .polygons()
            .into_iter()
            .flat_map(|p| p.iter())
            .flat_map(|r| r.iter())
            .peekable();
        points.peek()?;
        Some(points.fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        ))
    }
}

/// One row of the boundary dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub geometry: Geometry,
}

impl BoundaryFeature {
    /// Property rendered as text; numbers are formatted, `null` is `None`.
    pub fn property(&self, name: &str) -> Option<String> {
        match self.properties.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A boundary row after the left join. `matched` is `None` for incomplete data.
#[derive(Debug, Clone)]
pub struct JoinedRegion {
    pub boundary: BoundaryFeature,
    pub key: String,
    pub matched: Option<(RegionRecord, ClusterId)>,
}

impl JoinedRegion {
    pub fn cluster(&self) -> Option<ClusterId> {
        self.matched.as_ref().map(|(_, c)| *c)
    }
}
