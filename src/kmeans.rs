use crate::algorithm::{kmeans_lloyd, KMeansResult};
use crate::config::KMeansConfig;
use crate::convergence::Termination;
use crate::distance::{euclidean_distance, find_nearest_centroids};
use crate::error::{ClusterError, Result};
use ndarray::{Array1, Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// K-Means clustering with hard assignments.
///
/// # Example
///
/// ```
/// use emcluster_rs::{KMeans, KMeansConfig};
/// use ndarray::array;
///
/// let data = array![[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
///
/// let mut kmeans = KMeans::with_config(KMeansConfig::new(2).with_seed(42));
/// let model = kmeans.fit(&data.view()).unwrap();
///
/// assert_eq!(model.labels()[0], model.labels()[1]);
/// assert_ne!(model.labels()[0], model.labels()[2]);
/// ```
pub struct KMeans {
    /// Model configuration
    config: KMeansConfig,

    /// Fitted model (None if not yet fitted)
    model: Option<KMeansModel>,
}

impl KMeans {
    /// Create a new KMeans instance with default configuration and `k` clusters.
    pub fn new(k: usize) -> Self {
        Self::with_config(KMeansConfig::new(k))
    }

    /// Create a new KMeans instance with custom configuration.
    pub fn with_config(config: KMeansConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Fit the model, seeding a `ChaCha8Rng` from `config.seed`.
    ///
    /// # Arguments
    ///
    /// * `data` - Training data of shape (n_samples, n_features)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - k is 0 or there are fewer samples than k
    /// - the data contains non-finite values
    /// - a cluster empties and the policy is `EmptyClusterPolicy::Fail`
    pub fn fit(&mut self, data: &ArrayView2<f64>) -> Result<&KMeansModel> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.fit_with_rng(data, &mut rng)
    }

    /// Fit the model drawing all randomness from `rng`.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        data: &ArrayView2<f64>,
        rng: &mut R,
    ) -> Result<&KMeansModel> {
        let result = kmeans_lloyd(data, &self.config, rng)?;
        let model = KMeansModel::from_result(data, result);
        Ok(&*self.model.insert(model))
    }

    /// Predict cluster assignments for new data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model has not been fitted yet
    /// - Data dimensions don't match the training data
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        self.model
            .as_ref()
            .ok_or(ClusterError::NotFitted)?
            .predict(data)
    }

    /// Fit the model and return the cluster assignment of every training point.
    pub fn fit_predict(&mut self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        Ok(self.fit(data)?.labels().clone())
    }

    /// Get the fitted model, if any.
    pub fn model(&self) -> Option<&KMeansModel> {
        self.model.as_ref()
    }

    /// Consume the estimator and return the fitted model, if any.
    pub fn into_model(self) -> Option<KMeansModel> {
        self.model
    }

    /// Get the number of clusters.
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Get the configuration.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }
}

/// A fitted K-Means model. Read-only once produced.
#[derive(Debug, Clone)]
pub struct KMeansModel {
    centroids: Array2<f64>,
    labels: Array1<usize>,
    quality: f64,
    radii: Vec<f64>,
    n_iterations: usize,
    termination: Termination,
    inertia_history: Vec<f64>,
    shift_history: Vec<f64>,
}

impl KMeansModel {
    fn from_result(data: &ArrayView2<f64>, result: KMeansResult) -> Self {
        let k = result.centroids.nrows();
        let mut quality = 0.0;
        let mut radii = vec![0.0f64; k];

        for (point, &label) in data.outer_iter().zip(result.labels.iter()) {
            let dist = euclidean_distance(&point, &result.centroids.row(label));
            quality += dist;
            radii[label] = radii[label].max(dist);
        }

        Self {
            centroids: result.centroids,
            labels: result.labels,
            quality,
            radii,
            n_iterations: result.n_iterations,
            termination: result.termination,
            inertia_history: result.inertia_history,
            shift_history: result.shift_history,
        }
    }

    /// Centroids, one row per cluster
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Cluster index of every training point, from the last assignment step
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.centroids.ncols()
    }

    /// Sum of distances from every training point to its cluster's centroid.
    /// Lower is better.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Largest distance from a cluster's centroid to any of its members.
    /// A cluster without members has radius 0.
    pub fn radius(&self, cluster: usize) -> Result<f64> {
        self.radii.get(cluster).copied().ok_or_else(|| {
            ClusterError::InvalidParameter(format!(
                "Cluster index {} out of range for k = {}",
                cluster,
                self.k()
            ))
        })
    }

    /// Indices of the training points assigned to `cluster`, in ascending order
    pub fn cluster_members(&self, cluster: usize) -> Result<Vec<usize>> {
        if cluster >= self.k() {
            return Err(ClusterError::InvalidParameter(format!(
                "Cluster index {} out of range for k = {}",
                cluster,
                self.k()
            )));
        }

        Ok(self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(i, _)| i)
            .collect())
    }

    /// Number of training points in each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.k()];
        for &label in self.labels.iter() {
            sizes[label] += 1;
        }
        sizes
    }

    /// Assign each row of `data` to its nearest centroid (lowest index on ties)
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        if data.ncols() != self.n_features() {
            return Err(ClusterError::InvalidDimensions(format!(
                "Expected {} features, got {}",
                self.n_features(),
                data.ncols()
            )));
        }

        Ok(find_nearest_centroids(data, &self.centroids.view()))
    }

    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Within-cluster sum of squares after each assignment step.
    ///
    /// This is the objective Lloyd's iteration never increases (barring
    /// empty-cluster reseeding). [`quality`](Self::quality), the sum of plain
    /// distances, carries no such guarantee.
    pub fn inertia_history(&self) -> &[f64] {
        &self.inertia_history
    }

    /// Mean absolute centroid displacement of each update step
    pub fn shift_history(&self) -> &[f64] {
        &self.shift_history
    }
}
