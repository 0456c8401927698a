use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{ClusterId, StatsTable};

/// Coarse recommendation for a cluster, independent of the tiering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    LowMedium,
}

impl Priority {
    pub fn recommendation(&self) -> &'static str {
        match self {
            Priority::High => "Prioritize Mitigation",
            Priority::LowMedium => "Maintain Monitoring",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::LowMedium => write!(f, "LOW/MEDIUM"),
        }
    }
}

/// Per-cluster feature means.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterProfile {
    pub cluster: ClusterId,
    pub size: usize,
    /// One entry per feature; `None` when no row in the cluster has a value.
    pub means: Vec<Option<f64>>,
    pub priority: Priority,
}

impl ClusterProfile {
    fn overall(&self) -> Option<f64> {
        mean(self.means.iter().flatten().copied())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of each feature per cluster, with clusters whose average feature
/// mean exceeds the grand average marked [`Priority::High`].
pub fn cluster_profiles(
    table: &StatsTable,
    labels: &[ClusterId],
    features: &[String],
) -> Vec<ClusterProfile> {
    let mut members: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(row);
    }

    let mut profiles: Vec<ClusterProfile> = members
        .into_iter()
        .map(|(cluster, rows)| {
            let means = features
                .iter()
                .map(|f| mean(rows.iter().filter_map(|&r| table.rows[r].value(f))))
                .collect();
            ClusterProfile {
                cluster,
                size: rows.len(),
                means,
                priority: Priority::LowMedium,
            }
        })
        .collect();

    let grand = mean(profiles.iter().flat_map(|p| p.means.iter().flatten().copied()));
    if let Some(grand) = grand {
        for profile in &mut profiles {
            if profile.overall().is_some_and(|m| m > grand) {
                profile.priority = Priority::High;
            }
        }
    }
    profiles
}
