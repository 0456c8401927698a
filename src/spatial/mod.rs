//! Attach clustered statistics to boundary geometry.
//!
//! Boundary rows are filtered to the target province, both sides are keyed
//! with [`normalize_retain_kota`], and the statistics are left-joined onto
//! the boundaries so that every boundary row survives exactly once.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::config::SplitRegion;
use crate::error::PipelineError;
use crate::models::{BoundaryFeature, ClusterId, JoinedRegion, RegionRecord, StatsTable};
use crate::normalize::key::normalize_retain_kota;

pub mod simplify;

/// Knobs for [`spatial_join`].
#[derive(Debug, Clone)]
pub struct JoinSettings<'a> {
    pub province: &'a str,
    pub province_field: &'a str,
    pub region_field: &'a str,
    pub split_regions: &'a [SplitRegion],
    pub simplify_tolerance: f64,
}

/// Non-fatal findings from the join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum JoinWarning {
    /// A region present in the statistics has no boundary of its own and is
    /// drawn as part of its parent.
    FoldedIntoParent { child: String, parent: String },
    /// Boundary keys with no statistics row; drawn as incomplete data.
    Unmatched { keys: Vec<String> },
    /// Statistics keys that no boundary row uses.
    UnusedStatistics { keys: Vec<String> },
    /// Several statistics rows share a key; the first one is joined.
    DuplicateKeys { keys: Vec<String> },
    /// Boundary rows with an empty key matched a statistics row that also
    /// has an empty key.
    EmptyKeyMatch { rows: usize },
    /// Boundary rows kept in the join but with nothing to draw.
    WithoutGeometry { keys: Vec<String> },
}

impl std::fmt::Display for JoinWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinWarning::FoldedIntoParent { child, parent } => write!(
                f,
                "region '{}' is not separate in this boundary file; its data falls inside '{}'",
                child, parent
            ),
            JoinWarning::Unmatched { keys } => {
                write!(f, "{} boundary regions without data: {}", keys.len(), keys.join(", "))
            }
            JoinWarning::UnusedStatistics { keys } => {
                write!(f, "{} statistics rows not on the map: {}", keys.len(), keys.join(", "))
            }
            JoinWarning::DuplicateKeys { keys } => {
                write!(f, "duplicate statistics keys, first row used: {}", keys.join(", "))
            }
            JoinWarning::EmptyKeyMatch { rows } => {
                write!(f, "{} boundary rows joined on an empty key", rows)
            }
            JoinWarning::WithoutGeometry { keys } => {
                write!(
                    f,
                    "{} boundary rows have no polygon to draw: {}",
                    keys.len(),
                    keys.join(", ")
                )
            }
        }
    }
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub rows: Vec<JoinedRegion>,
    pub warnings: Vec<JoinWarning>,
}

/// Property holding the province name: `preferred` when the features carry
/// it, otherwise the first property key in file order.
pub fn province_field<'a>(features: &'a [BoundaryFeature], preferred: &'a str) -> Option<&'a str> {
    let first = features.first()?;
    if first.properties.contains_key(preferred) {
        return Some(preferred);
    }
    first.properties.keys().next().map(String::as_str)
}

/// Keep features whose province field contains `province`, ignoring case.
pub fn filter_province(
    features: Vec<BoundaryFeature>,
    province: &str,
    preferred_field: &str,
) -> Result<Vec<BoundaryFeature>, PipelineError> {
    let field = province_field(&features, preferred_field).map(str::to_string);
    let needle = province.to_uppercase();

    let kept: Vec<BoundaryFeature> = match field {
        Some(field) => features
            .into_iter()
            .filter(|f| {
                f.property(&field)
                    .map(|v| v.to_uppercase().contains(&needle))
                    .unwrap_or(false)
            })
            .collect(),
        None => Vec::new(),
    };

    if kept.is_empty() {
        return Err(PipelineError::EmptyFilterResult(province.to_string()));
    }
    Ok(kept)
}

/// Left-join clustered statistics onto the province's boundary rows.
///
/// `labels[i]` is the cluster of `table.rows[i]`.
pub fn spatial_join(
    boundaries: Vec<BoundaryFeature>,
    table: &StatsTable,
    labels: &[ClusterId],
    settings: &JoinSettings<'_>,
) -> Result<JoinOutcome, PipelineError> {
    let boundaries = filter_province(boundaries, settings.province, settings.province_field)?;
    let mut warnings = Vec::new();

    // Record keys are already `normalize_retain_kota(name)`.
    let mut by_key: HashMap<&str, (&RegionRecord, ClusterId)> = HashMap::new();
    let mut duplicates = BTreeSet::new();
    for (record, &label) in table.rows.iter().zip(labels) {
        if by_key.contains_key(record.key.as_str()) {
            duplicates.insert(record.key.clone());
        } else {
            by_key.insert(record.key.as_str(), (record, label));
        }
    }

    let mut unmatched = BTreeSet::new();
    let mut boundary_keys = BTreeSet::new();
    let mut empty_matches = 0;
    let mut without_geometry = Vec::new();

    let rows: Vec<JoinedRegion> = boundaries
        .into_iter()
        .map(|boundary| {
            let name = boundary.property(settings.region_field);
            let key = normalize_retain_kota(name.as_deref());
            let matched = by_key
                .get(key.as_str())
                .map(|(record, label)| ((*record).clone(), *label));

            if matched.is_none() {
                unmatched.insert(key.clone());
            } else if key.is_empty() {
                empty_matches += 1;
            }
            boundary_keys.insert(key.clone());
            if boundary.geometry.is_empty() {
                without_geometry.push(key.clone());
            }

            let boundary = if settings.simplify_tolerance > 0.0 {
                BoundaryFeature {
                    geometry: simplify::simplify_geometry(
                        &boundary.geometry,
                        settings.simplify_tolerance,
                    ),
                    ..boundary
                }
            } else {
                boundary
            };

            JoinedRegion { boundary, key, matched }
        })
        .collect();

    let mut folded = BTreeSet::new();
    for split in settings.split_regions {
        let child = normalize_retain_kota(Some(split.child.as_str()));
        if by_key.contains_key(child.as_str()) && !boundary_keys.contains(&child) {
            warnings.push(JoinWarning::FoldedIntoParent {
                child: split.child.clone(),
                parent: split.parent.clone(),
            });
            folded.insert(child);
        }
    }

    if !unmatched.is_empty() {
        warnings.push(JoinWarning::Unmatched { keys: unmatched.into_iter().collect() });
    }

    let unused: Vec<String> = by_key
        .keys()
        .filter(|k| !boundary_keys.contains(**k) && !folded.contains(**k))
        .map(|k| k.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !unused.is_empty() {
        warnings.push(JoinWarning::UnusedStatistics { keys: unused });
    }

    if !duplicates.is_empty() {
        warnings.push(JoinWarning::DuplicateKeys { keys: duplicates.into_iter().collect() });
    }
    if empty_matches > 0 {
        warnings.push(JoinWarning::EmptyKeyMatch { rows: empty_matches });
    }
    if !without_geometry.is_empty() {
        warnings.push(JoinWarning::WithoutGeometry { keys: without_geometry });
    }

    Ok(JoinOutcome { rows, warnings })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::ingest::geojson::parse_feature_collection;
    use crate::models::Geometry;

    fn feature(province: &str, region: &str) -> BoundaryFeature {
        let mut properties = serde_json::Map::new();
        properties.insert("NAME_1".into(), json!(province));
        properties.insert("NAME_2".into(), json!(region));
        BoundaryFeature {
            properties,
            geometry: Geometry::Polygon(vec![vec![
                (0.0, 0.0),
                (1.0, 0.0),
                (1.0, 1.0),
                (0.0, 0.0),
            ]]),
        }
    }

    fn stats(names: &[&str]) -> StatsTable {
        StatsTable {
            region_column: "nama_kabupaten_kota".into(),
            indicators: vec!["rumah_n".into()],
            rows: names
                .iter()
                .map(|n| RegionRecord::new(*n, BTreeMap::from([("rumah_n".to_string(), 1.0)])))
                .collect(),
        }
    }

    fn settings(splits: &[SplitRegion]) -> JoinSettings<'_> {
        JoinSettings {
            province: "jawabarat",
            province_field: "NAME_1",
            region_field: "NAME_2",
            split_regions: splits,
            simplify_tolerance: 0.0,
        }
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let features = vec![feature("JawaBarat", "Bogor"), feature("JawaTengah", "Cilacap")];
        let kept = filter_province(features, "jawabarat", "NAME_1").unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_filter_empty_is_error() {
        let features = vec![feature("JawaTengah", "Cilacap")];
        assert!(matches!(
            filter_province(features, "Banten", "NAME_1"),
            Err(PipelineError::EmptyFilterResult(_))
        ));
        assert!(filter_province(Vec::new(), "Banten", "NAME_1").is_err());
    }

    #[test]
    fn test_filter_falls_back_to_first_property() {
        let mut properties = serde_json::Map::new();
        properties.insert("PROVINSI".into(), json!("Jawa Barat"));
        let features = vec![BoundaryFeature {
            properties,
            geometry: Geometry::Polygon(vec![]),
        }];
        assert_eq!(filter_province(features, "jawa barat", "NAME_1").unwrap().len(), 1);
    }

    #[test]
    fn test_fallback_uses_first_key_in_file_order() {
        let content = r#"{"features": [
            {"properties": {"Z_PROVINSI": "Jawa Barat", "A_KAB": "Bogor"}, "geometry": null},
            {"properties": {"Z_PROVINSI": "Banten", "A_KAB": "Serang"}, "geometry": null}
        ]}"#;
        let features = parse_feature_collection(content).unwrap();
        assert_eq!(province_field(&features, "NAME_1"), Some("Z_PROVINSI"));

        let kept = filter_province(features, "jawa barat", "NAME_1").unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].property("A_KAB").as_deref(), Some("Bogor"));
    }

    #[test]
    fn test_rows_without_geometry_still_join() {
        let mut bare = feature("JawaBarat", "Garut");
        bare.geometry = Geometry::empty();
        let boundaries = vec![feature("JawaBarat", "Bogor"), bare];
        let table = stats(&["BOGOR", "GARUT"]);
        let outcome = spatial_join(boundaries, &table, &[0, 1], &settings(&[])).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[1].cluster(), Some(1));
        assert!(outcome.rows[1].boundary.geometry.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![JoinWarning::WithoutGeometry { keys: vec!["GARUT".into()] }]
        );
    }

    #[test]
    fn test_every_boundary_row_kept_once() {
        let boundaries = vec![
            feature("JawaBarat", "Bogor"),
            feature("JawaBarat", "Bogor"),
            feature("JawaBarat", "Depok"),
            feature("JawaBarat", "Garut"),
        ];
        let table = stats(&["BOGOR", "KOTA DEPOK"]);
        let outcome = spatial_join(boundaries, &table, &[0, 1], &settings(&[])).unwrap();

        assert_eq!(outcome.rows.len(), 4);
        assert_eq!(outcome.rows[0].cluster(), Some(0));
        assert_eq!(outcome.rows[1].cluster(), Some(0));
        assert_eq!(outcome.rows[2].cluster(), Some(1));
        assert_eq!(outcome.rows[2].key, "DEPOK");
        assert!(outcome.rows[3].matched.is_none());
        assert!(outcome
            .warnings
            .contains(&JoinWarning::Unmatched { keys: vec!["GARUT".into()] }));
    }

    #[test]
    fn test_city_and_regency_stay_distinct() {
        let boundaries =
            vec![feature("JawaBarat", "Bandung"), feature("JawaBarat", "Kota Bandung")];
        let table = stats(&["KABUPATEN BANDUNG", "KOTA BANDUNG"]);
        let outcome = spatial_join(boundaries, &table, &[2, 0], &settings(&[])).unwrap();
        assert_eq!(outcome.rows[0].cluster(), Some(2));
        assert_eq!(outcome.rows[1].cluster(), Some(0));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_split_off_region_reported() {
        let splits = vec![SplitRegion { child: "PANGANDARAN".into(), parent: "CIAMIS".into() }];
        let boundaries = vec![feature("JawaBarat", "Ciamis")];
        let table = stats(&["CIAMIS", "PANGANDARAN"]);
        let outcome = spatial_join(boundaries, &table, &[0, 0], &settings(&splits)).unwrap();

        assert!(outcome.warnings.contains(&JoinWarning::FoldedIntoParent {
            child: "PANGANDARAN".into(),
            parent: "CIAMIS".into(),
        }));
        // The folded region is not reported a second time as unused.
        assert!(!outcome
            .warnings
            .iter()
            .any(|w| matches!(w, JoinWarning::UnusedStatistics { .. })));
    }

    #[test]
    fn test_split_region_with_own_boundary_not_reported() {
        let splits = vec![SplitRegion { child: "PANGANDARAN".into(), parent: "CIAMIS".into() }];
        let boundaries = vec![feature("JawaBarat", "Ciamis"), feature("JawaBarat", "Pangandaran")];
        let table = stats(&["CIAMIS", "PANGANDARAN"]);
        let outcome = spatial_join(boundaries, &table, &[0, 1], &settings(&splits)).unwrap();
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_and_empty_keys_flagged() {
        let boundaries = vec![feature("JawaBarat", "Kabupaten")];
        let table = stats(&["", "GARUT", "Kab. Garut"]);
        let outcome = spatial_join(boundaries, &table, &[0, 1, 2], &settings(&[])).unwrap();

        assert_eq!(outcome.rows[0].key, "");
        assert_eq!(outcome.rows[0].cluster(), Some(0));
        assert!(outcome.warnings.contains(&JoinWarning::EmptyKeyMatch { rows: 1 }));
        assert!(outcome
            .warnings
            .contains(&JoinWarning::DuplicateKeys { keys: vec!["GARUT".into()] }));
    }
}
