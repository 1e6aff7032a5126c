//! Best-of-N K-Means driver.
//!
//! K-Means only finds a local optimum of its objective, so the usual remedy is
//! to fit several times from different random starts and keep the best model.

use crate::config::KMeansConfig;
use crate::error::{ClusterError, Result};
use crate::kmeans::{KMeans, KMeansModel};
use ndarray::ArrayView2;
use tracing::{debug, info, warn};

/// Outcome of one K-Means run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Position of the run, starting at 0
    pub run: usize,
    /// Seed the run was fitted with
    pub seed: u64,
    /// Model quality (sum of distances) on success
    pub outcome: std::result::Result<f64, ClusterError>,
}

/// Result of a model selection
#[derive(Debug, Clone)]
pub struct Selection {
    /// Model with the lowest quality value
    pub best: KMeansModel,
    /// Index into `runs` of the winning run
    pub best_run: usize,
    /// Every run in the order it was fitted
    pub runs: Vec<RunRecord>,
}

/// Fits K-Means repeatedly with consecutive seeds and keeps the lowest-quality model
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: KMeansConfig,
    n_runs: usize,
}

impl ModelSelector {
    /// Run `n_runs` fits of `config`, the i-th one seeded with `config.seed + i`
    pub fn new(config: KMeansConfig, n_runs: usize) -> Self {
        Self { config, n_runs }
    }

    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fit every run and return the best model along with the record of all runs.
    ///
    /// Failed runs are kept in `Selection::runs`. Ties on quality go to the
    /// earliest run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` when `n_runs` is 0, and the last run's error
    /// when no run succeeds.
    pub fn run(&self, data: &ArrayView2<f64>) -> Result<Selection> {
        if self.n_runs == 0 {
            return Err(ClusterError::InvalidParameter(
                "n_runs must be greater than 0".to_string(),
            ));
        }

        let mut runs = Vec::with_capacity(self.n_runs);
        let mut best: Option<(usize, KMeansModel)> = None;
        let mut last_error = None;

        for run in 0..self.n_runs {
            let seed = self.config.seed.wrapping_add(run as u64);
            let mut kmeans = KMeans::with_config(self.config.clone().with_seed(seed));

            let outcome = match kmeans.fit(data) {
                Ok(model) => {
                    let quality = model.quality();
                    debug!(run, seed, quality, "model selection run");
                    Ok(quality)
                }
                Err(err) => {
                    warn!(run, seed, error = %err, "model selection run failed");
                    last_error = Some(err.clone());
                    Err(err)
                }
            };

            if let Ok(quality) = outcome {
                let improves = best
                    .as_ref()
                    .map_or(true, |(_, model)| quality < model.quality());
                if improves {
                    if let Some(model) = kmeans.into_model() {
                        best = Some((run, model));
                    }
                }
            }

            runs.push(RunRecord { run, seed, outcome });
        }

        match best {
            Some((best_run, best)) => {
                info!(best_run, quality = best.quality(), "selected model");
                Ok(Selection {
                    best,
                    best_run,
                    runs,
                })
            }
            None => Err(last_error.unwrap_or(ClusterError::NotFitted)),
        }
    }
}
