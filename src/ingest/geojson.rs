use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::PipelineError;
use crate::models::{BoundaryFeature, Geometry, PolygonRings, Ring};

/// Read a GeoJSON FeatureCollection of Polygon/MultiPolygon features.
///
/// Features with a null geometry or another geometry type are kept with an
/// empty geometry so their attributes still join; a malformed coordinate
/// array is an error.
pub fn load_boundaries(path: &Path) -> Result<Vec<BoundaryFeature>> {
    if !path.exists() {
        return Err(PipelineError::MissingFile(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_feature_collection(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_feature_collection(content: &str) -> Result<Vec<BoundaryFeature>> {
    let json: Value = serde_json::from_str(content)?;
    let features = json
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| PipelineError::Geometry("missing `features` array".to_string()))?;

    let mut out = Vec::with_capacity(features.len());
    for feature in features {
        let geometry = match feature.get("geometry").filter(|g| !g.is_null()) {
            Some(g) => parse_geometry(g)?.unwrap_or_else(Geometry::empty),
            None => Geometry::empty(),
        };
        let properties = feature
            .get("properties")
            .and_then(|p| p.as_object())
            .cloned()
            .unwrap_or_default();
        out.push(BoundaryFeature { properties, geometry });
    }
    Ok(out)
}

fn parse_geometry(geometry: &Value) -> Result<Option<Geometry>> {
    let kind = geometry.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let coords = geometry.get("coordinates");
    match (kind, coords) {
        ("Polygon", Some(c)) => Ok(Some(Geometry::Polygon(parse_polygon(c)?))),
        ("MultiPolygon", Some(c)) => {
            let polygons = c
                .as_array()
                .ok_or_else(|| PipelineError::Geometry("MultiPolygon coordinates".to_string()))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(Geometry::MultiPolygon(polygons)))
        }
        _ => Ok(None),
    }
}

fn parse_polygon(value: &Value) -> Result<PolygonRings> {
    value
        .as_array()
        .ok_or_else(|| PipelineError::Geometry("Polygon coordinates".to_string()))?
        .iter()
        .map(parse_ring)
        .collect()
}

fn parse_ring(value: &Value) -> Result<Ring> {
    let positions = value
        .as_array()
        .ok_or_else(|| PipelineError::Geometry("ring is not an array".to_string()))?;
    positions
        .iter()
        .map(|p| {
            let lon = p.get(0).and_then(|v| v.as_f64());
            let lat = p.get(1).and_then(|v| v.as_f64());
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(PipelineError::Geometry(format!("bad position {}", p)).into()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature",
         "properties": {"NAME_1": "JawaBarat", "NAME_2": "Bogor"},
         "geometry": {"type": "Polygon",
                      "coordinates": [[[106.0,-6.0],[107.0,-6.0],[107.0,-7.0],[106.0,-6.0]]]}},
        {"type": "Feature",
         "properties": {"NAME_1": "JawaBarat", "NAME_2": "Depok"},
         "geometry": {"type": "MultiPolygon",
                      "coordinates": [[[[106.8,-6.4],[106.9,-6.4],[106.9,-6.5],[106.8,-6.4]]]]}},
        {"type": "Feature", "properties": {"NAME_2": "Point"},
         "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
        {"type": "Feature", "properties": {}, "geometry": null}
      ]
    }"#;

    #[test]
    fn test_parse_polygons_and_keep_others_empty() {
        let features = parse_feature_collection(SAMPLE).unwrap();
        assert_eq!(features.len(), 4);
        assert_eq!(features[0].property("NAME_2").as_deref(), Some("Bogor"));
        assert!(matches!(features[0].geometry, Geometry::Polygon(ref p) if p[0].len() == 4));
        assert!(matches!(features[1].geometry, Geometry::MultiPolygon(ref ps) if ps.len() == 1));
        assert_eq!(features[2].property("NAME_2").as_deref(), Some("Point"));
        assert!(features[2].geometry.is_empty());
        assert!(features[3].geometry.is_empty());
        assert!(features[3].properties.is_empty());
    }

    #[test]
    fn test_bad_position_is_error() {
        let bad = r#"{"features": [{"properties": {}, "geometry":
            {"type": "Polygon", "coordinates": [[["x", 1.0]]]}}]}"#;
        assert!(parse_feature_collection(bad).is_err());
    }

    #[test]
    fn test_missing_features_array() {
        assert!(parse_feature_collection(r#"{"type": "Feature"}"#).is_err());
    }
}
