use thiserror::Error;

/// Result alias used throughout emcluster-rs
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Error types for the emcluster-rs library
///
/// The last four variants are algorithmic failures of a single fit attempt. They are
/// never retried internally; a caller may refit with a fresh seed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// The number of clusters k is invalid (must be > 0)
    #[error("Invalid k value: {0}")]
    InvalidK(String),

    /// Not enough data points for the requested number of clusters
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Model has not been fitted yet
    #[error("Model has not been fitted. Call fit() first.")]
    NotFitted,

    /// Dimension mismatch between data and model
    #[error("Dimension mismatch: {0}")]
    InvalidDimensions(String),

    /// A parameter or input value is out of its valid domain
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Matrix is numerically non-invertible
    #[error("Singular matrix: |determinant| = {determinant:e} is below tolerance")]
    SingularMatrix { determinant: f64 },

    /// Covariance determinant is negative beyond numerical noise
    #[error("Matrix is not positive definite: determinant = {determinant:e}")]
    NotPositiveDefinite { determinant: f64 },

    /// Every weighted component density vanished for a point
    #[error("Degenerate mixture: all component densities vanish for point {point}")]
    DegenerateMixture { point: usize },

    /// A K-Means cluster lost all of its members
    #[error("Empty cluster: cluster {cluster} has no members after iteration {iteration}")]
    EmptyCluster { cluster: usize, iteration: usize },
}
