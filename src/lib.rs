//! # emcluster-rs
//!
//! K-Means and Gaussian Mixture Model clustering in Rust, compatible with
//! ndarray.
//!
//! Both models are fitted by alternating an expectation step and a
//! maximization step until convergence:
//!
//! - **K-Means** assigns every point to its nearest centroid, then moves every
//!   centroid to the mean of its members. It stops when the mean absolute
//!   centroid displacement drops to the configured error rate.
//! - **GMM** re-estimates each component's mean, full covariance and weight from
//!   soft responsibilities, then recomputes the responsibilities by Bayes' rule.
//!   It stops when the log-likelihood stops improving.
//!
//! ## Features
//!
//! - **Reproducible**: every random draw comes from a seeded `ChaCha8Rng`, or an
//!   RNG you pass to `fit_with_rng`
//! - **Typed failures**: singular covariances, vanishing mixtures and empty
//!   clusters surface as [`ClusterError`] values instead of NaNs
//! - **Parallel steps**: per-point work runs on rayon against an immutable
//!   parameter snapshot; reductions stay in point order
//! - **Model selection**: [`ModelSelector`] keeps the best of several K-Means runs
//!
//! ## Example
//!
//! ```rust
//! use emcluster_rs::{GaussianMixture, GmmConfig, KMeansConfig, ModelSelector};
//! use ndarray::array;
//!
//! let data = array![
//!     [0.0, 0.0], [0.2, 0.4], [0.5, 0.1], [0.3, 0.6],
//!     [9.0, 9.0], [9.4, 9.2], [9.1, 9.5], [9.6, 9.7],
//! ];
//!
//! // Best of five K-Means runs
//! let selection = ModelSelector::new(KMeansConfig::new(2).with_seed(1), 5)
//!     .run(&data.view())
//!     .unwrap();
//! let kmeans = &selection.best;
//! assert_eq!(kmeans.labels()[0], kmeans.labels()[1]);
//! assert_ne!(kmeans.labels()[0], kmeans.labels()[4]);
//!
//! // Soft clustering
//! let mut gmm = GaussianMixture::with_config(GmmConfig::new(2).with_seed(3));
//! let model = gmm.fit(&data.view()).unwrap();
//! let labels = model.predict(&data.view()).unwrap();
//! assert_eq!(labels.len(), 8);
//! ```

mod algorithm;
mod config;
mod convergence;
pub mod density;
mod distance;
mod em;
mod error;
mod gmm;
mod kmeans;
pub mod linalg;
mod selection;

pub use config::{EmptyClusterPolicy, GmmConfig, InitMethod, KMeansConfig};
pub use convergence::Termination;
pub use density::{density, Gaussian};
pub use distance::euclidean_distance;
pub use error::{ClusterError, Result};
pub use gmm::{Ellipse, GaussianMixture, GmmModel, PrincipalAxes};
pub use kmeans::{KMeans, KMeansModel};
pub use selection::{ModelSelector, RunRecord, Selection};
