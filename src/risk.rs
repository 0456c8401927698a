//! Turns opaque cluster ids into ordered risk tiers.
//!
//! Clusters are ranked by the mean of a severity indicator (the first
//! housing-damage column) and the ranking is mapped onto High/Medium/Low.
//! Tiers are never stored: every view calls [`rank`] on the rows it draws.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{ClusterId, RegionRecord, RiskTier};

/// Substrings that mark a column as a severity indicator.
const SEVERITY_MARKERS: [&str; 2] = ["rumah", "damage"];

/// First field whose name contains `rumah` or `damage`.
pub fn detect_severity_field<'a, I>(fields: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    fields
        .into_iter()
        .find(|f| SEVERITY_MARKERS.iter().any(|m| f.contains(m)))
        .map(String::as_str)
}

/// Group records by cluster id, dropping rows without one.
pub fn group_by_cluster<'a, I>(rows: I) -> BTreeMap<ClusterId, Vec<&'a RegionRecord>>
where
    I: IntoIterator<Item = (Option<ClusterId>, &'a RegionRecord)>,
{
    let mut groups: BTreeMap<ClusterId, Vec<&RegionRecord>> = BTreeMap::new();
    for (cluster, record) in rows {
        if let Some(cluster) = cluster {
            groups.entry(cluster).or_default().push(record);
        }
    }
    groups
}

/// Mean of `field` over the records that have it.
pub fn severity_mean(records: &[&RegionRecord], field: &str) -> Option<f64> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.value(field)).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Cluster ids ordered from most to least severe.
///
/// Equal means keep ascending cluster-id order; clusters without any value
/// for `field` come last.
pub fn order_clusters(
    records_by_cluster: &BTreeMap<ClusterId, Vec<&RegionRecord>>,
    field: &str,
) -> Vec<(ClusterId, Option<f64>)> {
    let mut means: Vec<(ClusterId, Option<f64>)> = records_by_cluster
        .iter()
        .map(|(&id, records)| (id, severity_mean(records, field)))
        .collect();

    // BTreeMap iteration is already id-ascending and sort_by is stable.
    means.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    means
}

/// Assign a tier to every cluster.
///
/// - 3 or more clusters: first High, second Medium, the rest Low.
/// - 2 clusters: High and Low.
/// - 1 cluster: High.
/// - none: empty map.
pub fn rank(
    records_by_cluster: &BTreeMap<ClusterId, Vec<&RegionRecord>>,
    severity_field: &str,
) -> BTreeMap<ClusterId, RiskTier> {
    let ordered = order_clusters(records_by_cluster, severity_field);
    let n = ordered.len();

    ordered
        .into_iter()
        .enumerate()
        .map(|(position, (id, _))| {
            let tier = match (n, position) {
                (_, 0) => RiskTier::High,
                (2, _) => RiskTier::Low,
                (_, 1) => RiskTier::Medium,
                _ => RiskTier::Low,
            };
            (id, tier)
        })
        .collect()
}

/// Tiers for a set of `(cluster, record)` rows, or `None` when no severity
/// indicator exists among `fields`.
pub fn tiers_for_rows<'a, I, F>(
    rows: I,
    fields: F,
) -> Option<(String, BTreeMap<ClusterId, RiskTier>)>
where
    I: IntoIterator<Item = (Option<ClusterId>, &'a RegionRecord)>,
    F: IntoIterator<Item = &'a String>,
{
    let field = detect_severity_field(fields)?;
    let groups = group_by_cluster(rows);
    Some((field.to_string(), rank(&groups, field)))
}
