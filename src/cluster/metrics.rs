use std::collections::BTreeMap;

use linfa::metrics::SilhouetteScore;
use linfa::DatasetBase;
use ndarray::{Array1, Axis};
use serde::Serialize;

use crate::cluster::{squared_distance, Matrix};
use crate::error::PipelineError;
use crate::models::ClusterId;

/// Internal validation scores for one clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidationScores {
    /// In `[-1, 1]`; above 0.5 indicates well separated clusters.
    pub silhouette: f64,
    /// Lower is better.
    pub davies_bouldin: f64,
    /// Higher is better.
    pub calinski_harabasz: f64,
}

/// Compute all three scores. Needs at least two distinct clusters.
pub fn evaluate(data: &Matrix, labels: &[ClusterId]) -> Result<ValidationScores, PipelineError> {
    let groups = members(labels);
    if groups.len() < 2 {
        return Err(PipelineError::InsufficientClusters { found: groups.len() });
    }

    Ok(ValidationScores {
        silhouette: silhouette(data, labels)?,
        davies_bouldin: davies_bouldin(data, &groups),
        calinski_harabasz: calinski_harabasz(data, &groups),
    })
}

fn members(labels: &[ClusterId]) -> BTreeMap<ClusterId, Vec<usize>> {
    let mut groups: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }
    groups
}

/// Mean silhouette coefficient. Fully coincident clusters score 0.
fn silhouette(data: &Matrix, labels: &[ClusterId]) -> Result<f64, PipelineError> {
    let dataset = DatasetBase::new(data.clone(), Array1::from(labels.to_vec()));
    let score = dataset
        .silhouette_score()
        .map_err(|e| PipelineError::Clustering(e.to_string()))?;
    Ok(if score.is_finite() { score } else { 0.0 })
}

fn centroid(data: &Matrix, idx: &[usize]) -> Array1<f64> {
    data.select(Axis(0), idx)
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()))
}

fn davies_bouldin(data: &Matrix, groups: &BTreeMap<ClusterId, Vec<usize>>) -> f64 {
    let stats: Vec<(Array1<f64>, f64)> = groups
        .values()
        .map(|idx| {
            let c = centroid(data, idx);
            let scatter = idx
                .iter()
                .map(|&i| squared_distance(data.row(i), c.view()).sqrt())
                .sum::<f64>()
                / idx.len() as f64;
            (c, scatter)
        })
        .collect();

    let worst: f64 = stats
        .iter()
        .enumerate()
        .map(|(i, (ci, si))| {
            stats
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (cj, sj))| {
                    let separation = squared_distance(ci.view(), cj.view()).sqrt();
                    if separation > 0.0 {
                        (si + sj) / separation
                    } else {
                        0.0
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();
    worst / stats.len() as f64
}

fn calinski_harabasz(data: &Matrix, groups: &BTreeMap<ClusterId, Vec<usize>>) -> f64 {
    let n = data.nrows();
    let k = groups.len();
    let overall = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()));

    let mut between = 0.0;
    let mut within = 0.0;
    for idx in groups.values() {
        let c = centroid(data, idx);
        between += idx.len() as f64 * squared_distance(c.view(), overall.view());
        within += idx
            .iter()
            .map(|&i| squared_distance(data.row(i), c.view()))
            .sum::<f64>();
    }

    if within == 0.0 || n == k {
        return 1.0;
    }
    (between / (k - 1) as f64) / (within / (n - k) as f64)
}
