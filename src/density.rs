//! Multivariate normal density.
//!
//! ```text
//! N(x | μ, Σ) = (2π)^(-D/2) · |Σ|^(-1/2) · exp(-½ (x-μ)ᵀ Σ⁻¹ (x-μ))
//! ```

use crate::error::{ClusterError, Result};
use crate::linalg::{inverse, log_determinant_spd};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::f64::consts::PI;

/// A Gaussian with its precision matrix and normalising constant precomputed,
/// so evaluating it at many points costs one quadratic form each.
#[derive(Debug, Clone)]
pub struct Gaussian {
    mean: Array1<f64>,
    precision: Array2<f64>,
    norm: f64,
    log_norm: f64,
}

impl Gaussian {
    /// Build a Gaussian from a mean vector and covariance matrix.
    ///
    /// # Errors
    ///
    /// - `InvalidDimensions` if the covariance is not D×D for a D-dimensional mean
    /// - `SingularMatrix` if `Σ` is rank deficient up to rounding, whatever its scale
    /// - `NotPositiveDefinite` if `Σ` has full rank but is not positive definite
    pub fn new(mean: &ArrayView1<f64>, covariance: &ArrayView2<f64>) -> Result<Self> {
        let d = mean.len();
        if covariance.dim() != (d, d) {
            return Err(ClusterError::InvalidDimensions(format!(
                "Expected a {}x{} covariance, got {}x{}",
                d,
                d,
                covariance.nrows(),
                covariance.ncols()
            )));
        }

        // Rank deficiency surfaces as SingularMatrix before definiteness is checked
        let log_det = log_determinant_spd(covariance)?;
        let precision = inverse(covariance)?;

        let log_norm = -0.5 * (d as f64 * (2.0 * PI).ln() + log_det);
        let norm = log_norm.exp();

        Ok(Self {
            mean: mean.to_owned(),
            precision,
            norm,
            log_norm,
        })
    }

    /// Squared Mahalanobis distance `(x-μ)ᵀ Σ⁻¹ (x-μ)`
    pub fn mahalanobis_squared(&self, point: &ArrayView1<f64>) -> f64 {
        let diff = point - &self.mean;
        diff.dot(&self.precision.dot(&diff))
    }

    /// Probability density at `point`
    pub fn pdf(&self, point: &ArrayView1<f64>) -> f64 {
        self.norm * (-0.5 * self.mahalanobis_squared(point)).exp()
    }

    /// Natural log of the density at `point`; finite even where `pdf` underflows
    pub fn log_pdf(&self, point: &ArrayView1<f64>) -> f64 {
        self.log_norm - 0.5 * self.mahalanobis_squared(point)
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }
}

/// Evaluate the multivariate normal density `N(point | mean, covariance)`.
///
/// Convenience for one-off evaluations; build a [`Gaussian`] once when the same
/// parameters are evaluated at many points.
pub fn density(
    point: &ArrayView1<f64>,
    mean: &ArrayView1<f64>,
    covariance: &ArrayView2<f64>,
) -> Result<f64> {
    if point.len() != mean.len() {
        return Err(ClusterError::InvalidDimensions(format!(
            "Expected a point with {} features, got {}",
            mean.len(),
            point.len()
        )));
    }
    Ok(Gaussian::new(mean, covariance)?.pdf(point))
}
