/// How K-Means picks its initial centroids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMethod {
    /// k distinct data points drawn uniformly without replacement
    #[default]
    Random,

    /// k-means++ seeding: each further centroid is drawn with probability
    /// proportional to its squared distance from the nearest chosen one
    KMeansPlusPlus,
}

/// What K-Means does when a cluster loses every member during an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyClusterPolicy {
    /// Move the centroid onto a randomly chosen data point and keep iterating
    #[default]
    Reseed,

    /// Abort the fit with `ClusterError::EmptyCluster`
    Fail,
}

/// Configuration for the K-Means algorithm
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,

    /// Maximum number of iterations
    pub max_iters: usize,

    /// Convergence tolerance (error rate). The fit stops once the mean absolute
    /// per-coordinate centroid displacement is at or below this value.
    pub tol: f64,

    /// Random seed for centroid initialization and empty-cluster re-seeding
    pub seed: u64,

    /// Centroid initialization strategy
    pub init: InitMethod,

    /// Empty cluster handling
    pub empty_cluster: EmptyClusterPolicy,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iters: 100,
            tol: 0.01,
            seed: 0,
            init: InitMethod::Random,
            empty_cluster: EmptyClusterPolicy::Reseed,
        }
    }
}

impl KMeansConfig {
    /// Create a new configuration with the specified number of clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the initialization strategy
    pub fn with_init(mut self, init: InitMethod) -> Self {
        self.init = init;
        self
    }

    /// Set the empty cluster policy
    pub fn with_empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }
}

/// Configuration for the Gaussian Mixture Model EM fit
#[derive(Debug, Clone)]
pub struct GmmConfig {
    /// Number of mixture components
    pub k: usize,

    /// Maximum number of EM iterations
    pub max_iters: usize,

    /// Convergence threshold on the log-likelihood change between iterations
    pub tol: f64,

    /// Random seed for the initial responsibilities
    pub seed: u64,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iters: 100,
            tol: 0.01,
            seed: 0,
        }
    }
}

impl GmmConfig {
    /// Create a new configuration with the specified number of components
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the maximum number of EM iterations
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the log-likelihood convergence threshold
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
