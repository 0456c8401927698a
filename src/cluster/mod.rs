//! Standardization and k-means clustering of the statistics table.
//!
//! - [`metrics`]: silhouette, Davies-Bouldin and Calinski-Harabasz scores.
//! - [`pca`]: two-component projection for the validation scatter plot.
//! - [`profile`]: per-cluster feature means and recommendations.

use std::collections::BTreeSet;

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::PipelineError;
use crate::models::{ClusterId, StatsTable};

pub mod metrics;
pub mod pca;
pub mod profile;

const MAX_ITERATIONS: u64 = 300;
const TOLERANCE: f64 = 1e-4;

/// Feature matrix, one row per region.
pub type Matrix = Array2<f64>;

/// Output of [`run_kmeans`].
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Cluster per table row.
    pub labels: Vec<ClusterId>,
    /// Features actually used, in configured order.
    pub features: Vec<String>,
    /// Configured features absent from the table.
    pub missing_features: Vec<String>,
    /// Standardized feature matrix, one row per table row.
    pub scaled: Matrix,
    pub inertia: f64,
}

/// k-means hyper-parameters.
#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
}

/// Cluster the table rows on `features`.
///
/// Missing values count as zero. Fails when none of `features` exist in the
/// table or when `k` does not fit the row count.
pub fn run_kmeans(
    table: &StatsTable,
    features: &[String],
    params: KMeansParams,
) -> Result<ClusterResult, PipelineError> {
    let (present, missing): (Vec<String>, Vec<String>) = features
        .iter()
        .cloned()
        .partition(|f| table.has_indicator(f));

    if present.is_empty() {
        return Err(PipelineError::NoFeatureMatch {
            wanted: features.to_vec(),
        });
    }

    let raw = Matrix::from_shape_fn((table.rows.len(), present.len()), |(r, c)| {
        table.rows[r].value(&present[c]).unwrap_or(0.0)
    });
    let scaled = standardize(&raw);
    let (labels, inertia) = kmeans(&scaled, params)?;

    Ok(ClusterResult {
        labels,
        features: present,
        missing_features: missing,
        scaled,
        inertia,
    })
}

/// Scale each column to zero mean and unit population variance.
///
/// Constant columns are centered but not scaled.
pub fn standardize(data: &Matrix) -> Matrix {
    if data.nrows() == 0 {
        return data.clone();
    }
    let means = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()));
    let scales = data
        .std_axis(Axis(0), 0.0)
        .mapv(|sd| if sd > f64::EPSILON { sd } else { 1.0 });
    (data - &means) / &scales
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Run seeded k-means++ `restarts` times and keep the lowest-inertia fit.
///
/// `k` must not exceed the number of distinct rows, otherwise seeding has
/// no point left to pick.
pub fn kmeans(data: &Matrix, params: KMeansParams) -> Result<(Vec<ClusterId>, f64), PipelineError> {
    let KMeansParams { k, seed, restarts } = params;
    if k == 0 || k > data.nrows() {
        return Err(PipelineError::InvalidClusterCount { k, rows: data.nrows() });
    }
    let distinct = distinct_rows(data);
    if k > distinct {
        return Err(PipelineError::InvalidClusterCount { k, rows: distinct });
    }

    let dataset = DatasetBase::from(data.clone());
    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(seed))
        .n_runs(restarts.max(1))
        .max_n_iterations(MAX_ITERATIONS)
        .tolerance(TOLERANCE)
        .fit(&dataset)
        .map_err(|e| PipelineError::Clustering(e.to_string()))?;

    let labels: Array1<usize> = model.predict(data);
    Ok((labels.to_vec(), model.inertia()))
}

fn distinct_rows(data: &Matrix) -> usize {
    data.rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;
    use crate::ingest::loader::stats_from_raw;
    use crate::ingest::RawTable;
    use crate::models::RegionRecord;

    fn blobs() -> Matrix {
        array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [10.0, 10.0],
            [10.1, 9.9],
            [9.8, 10.2],
            [-10.0, 10.0],
            [-9.9, 10.1],
        ]
    }

    fn params(k: usize) -> KMeansParams {
        KMeansParams { k, seed: 42, restarts: 10 }
    }

    #[test]
    fn test_standardize_moments() {
        let scaled = standardize(&array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]]);
        let column = scaled.column(0);
        assert_relative_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(column.var(0.0), 1.0, epsilon = 1e-12);
        // Constant column is centered only.
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let (labels, inertia) = kmeans(&blobs(), params(3)).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_eq!(labels[6], labels[7]);
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[0], labels[6]);
        assert_ne!(labels[3], labels[6]);
        assert!(inertia < 1.0);
    }

    #[test]
    fn test_kmeans_reproducible_with_seed() {
        let first = kmeans(&blobs(), params(3)).unwrap();
        let second = kmeans(&blobs(), params(3)).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_kmeans_rejects_bad_k() {
        assert!(matches!(
            kmeans(&blobs(), params(0)),
            Err(PipelineError::InvalidClusterCount { .. })
        ));
        assert!(matches!(
            kmeans(&blobs(), params(9)),
            Err(PipelineError::InvalidClusterCount { k: 9, rows: 8 })
        ));
    }

    #[test]
    fn test_kmeans_needs_distinct_points() {
        let data = array![[1.0], [1.0], [1.0]];
        assert!(matches!(
            kmeans(&data, params(2)),
            Err(PipelineError::InvalidClusterCount { k: 2, rows: 1 })
        ));
        let (labels, inertia) = kmeans(&array![[1.0], [1.0], [4.0]], params(2)).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], labels[2]);
        assert_relative_eq!(inertia, 0.0, epsilon = 1e-12);
    }

    fn table() -> StatsTable {
        let rows = [("A", 1.0), ("B", 1.2), ("C", 9.0), ("D", 9.5)]
            .iter()
            .map(|(name, v)| {
                RegionRecord::new(*name, BTreeMap::from([("rumah_n".to_string(), *v)]))
            })
            .collect();
        StatsTable {
            region_column: "nama_kabupaten_kota".into(),
            indicators: vec!["rumah_n".into()],
            rows,
        }
    }

    #[test]
    fn test_run_kmeans_reports_missing_features() {
        let features = vec!["rumah_n".to_string(), "gempa_n".to_string()];
        let result = run_kmeans(&table(), &features, params(2)).unwrap();
        assert_eq!(result.features, vec!["rumah_n"]);
        assert_eq!(result.missing_features, vec!["gempa_n"]);
        assert_eq!(result.labels.len(), 4);
        assert_eq!(result.labels[0], result.labels[1]);
        assert_ne!(result.labels[0], result.labels[2]);
        assert_eq!(result.scaled.ncols(), 1);
    }

    #[test]
    fn test_run_kmeans_without_features_fails() {
        let features = vec!["gempa_n".to_string()];
        assert!(matches!(
            run_kmeans(&table(), &features, params(2)),
            Err(PipelineError::NoFeatureMatch { .. })
        ));
    }

    #[test]
    fn test_na_cells_cluster_as_zero() {
        let raw = RawTable {
            headers: vec!["nama_kabupaten_kota".into(), "rumah".into(), "banjir".into()],
            rows: vec![
                vec!["A".into(), "NaN".into(), "1".into()],
                vec!["B".into(), "5".into(), "NA".into()],
                vec!["C".into(), "9".into(), "3".into()],
            ],
        };
        let table = stats_from_raw(&raw, "nama_kabupaten_kota", "agg.csv").unwrap().table;
        let features = vec!["rumah".to_string(), "banjir".to_string()];

        let result = run_kmeans(&table, &features, params(2)).unwrap();
        assert_eq!(result.features, features);
        assert!(result.missing_features.is_empty());
        assert!(result.scaled.iter().all(|v| v.is_finite()));
        assert!(result.inertia.is_finite());
        let distinct: BTreeSet<_> = result.labels.iter().collect();
        assert_eq!(distinct.len(), 2);
    }
}
