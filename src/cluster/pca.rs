use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_reduction::Pca;
use ndarray::{Array2, Axis};
use serde::Serialize;

use crate::cluster::Matrix;
use crate::error::PipelineError;

/// Rows projected onto the first two principal components.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub points: Vec<(f64, f64)>,
    pub explained_variance_ratio: [f64; 2],
}

/// Project `data` onto its two leading principal components.
///
/// Each component is signed so that it correlates positively with the first
/// feature. A single-feature matrix projects onto the x axis only.
pub fn project_2d(data: &Matrix) -> Result<Projection, PipelineError> {
    let n = data.nrows();
    let components = data.ncols().min(2).min(n.saturating_sub(1));
    if components == 0 {
        return Ok(Projection {
            points: vec![(0.0, 0.0); n],
            explained_variance_ratio: [0.0, 0.0],
        });
    }

    let pca = Pca::params(components)
        .fit(&DatasetBase::from(data.clone()))
        .map_err(|e| PipelineError::Clustering(format!("PCA: {}", e)))?;
    let mut embedded: Array2<f64> = pca.predict(data);
    orient(&mut embedded, data);

    // Ratios against the total sample variance of every input feature.
    let total = data.var_axis(Axis(0), 1.0).sum();
    let component_var = embedded.var_axis(Axis(0), 1.0);
    let ratio = |i: usize| match component_var.get(i) {
        Some(v) if total > 0.0 => v / total,
        _ => 0.0,
    };

    let points = embedded
        .rows()
        .into_iter()
        .map(|r| (r[0], r.get(1).copied().unwrap_or(0.0)))
        .collect();

    Ok(Projection {
        points,
        explained_variance_ratio: [ratio(0), ratio(1)],
    })
}

fn orient(embedded: &mut Array2<f64>, data: &Matrix) {
    let first = data.column(0);
    let mean = first.mean().unwrap_or(0.0);
    for mut column in embedded.columns_mut() {
        let covariance: f64 = column.iter().zip(first.iter()).map(|(p, x)| p * (x - mean)).sum();
        if covariance < 0.0 {
            column.mapv_inplace(|v| -v);
        }
    }
}
