use crate::config::{EmptyClusterPolicy, InitMethod, KMeansConfig};
use crate::convergence::{ConvergenceState, Termination};
use crate::distance::{find_nearest_centroids, mean_absolute_shift, squared_distance};
use crate::error::{ClusterError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

/// Result of the k-means algorithm
pub struct KMeansResult {
    pub centroids: Array2<f64>,
    pub labels: Array1<usize>,
    pub n_iterations: usize,
    pub termination: Termination,
    /// Within-cluster sum of squares measured after every assignment step
    pub inertia_history: Vec<f64>,
    /// Mean absolute centroid displacement of every update step
    pub shift_history: Vec<f64>,
}

/// Check a point set before fitting `k` clusters or components on it
pub(crate) fn validate_points(data: &ArrayView2<f64>, k: usize) -> Result<()> {
    let (n_samples, n_features) = data.dim();

    if k == 0 {
        return Err(ClusterError::InvalidK(
            "k must be greater than 0".to_string(),
        ));
    }

    if n_features == 0 {
        return Err(ClusterError::InvalidDimensions(
            "Data must have at least one feature".to_string(),
        ));
    }

    if n_samples < k {
        return Err(ClusterError::InsufficientData(format!(
            "Number of samples ({}) is less than k ({})",
            n_samples, k
        )));
    }

    if let Some(((row, col), _)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ClusterError::InvalidParameter(format!(
            "Non-finite value at row {}, column {}",
            row, col
        )));
    }

    Ok(())
}

/// Run Lloyd's k-means iteration.
///
/// Each iteration assigns every point to its nearest centroid (E-step), then
/// moves every centroid to the mean of its members (M-step). The fit stops when
/// the mean absolute centroid displacement is at or below `config.tol`, or after
/// `config.max_iters` iterations.
pub fn kmeans_lloyd<R: Rng + ?Sized>(
    data: &ArrayView2<f64>,
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<KMeansResult> {
    validate_points(data, config.k)?;

    if config.max_iters == 0 {
        return Err(ClusterError::InvalidParameter(
            "max_iters must be greater than 0".to_string(),
        ));
    }

    let n_samples = data.nrows();
    let n_features = data.ncols();
    let k = config.k;

    debug!(
        n_samples,
        n_features,
        k,
        init = ?config.init,
        "Training k-means"
    );

    let mut centroids = match config.init {
        InitMethod::Random => initialize_centroids(data, k, rng),
        InitMethod::KMeansPlusPlus => initialize_centroids_plus_plus(data, k, rng),
    };

    let mut state = ConvergenceState::new();
    let mut labels = Array1::zeros(n_samples);
    let mut inertia_history = Vec::new();
    let mut shift_history = Vec::new();
    let mut termination = Termination::MaxIterationsReached;

    while !state.exhausted(config.max_iters) {
        let iteration = state.iteration() + 1;

        // E-step: every point joins exactly one cluster
        labels = find_nearest_centroids(data, &centroids.view());
        let inertia = compute_inertia(data, &labels.view(), &centroids.view());
        inertia_history.push(inertia);

        // M-step
        let (cluster_sums, cluster_counts) = accumulate_clusters(data, &labels.view(), k);
        let prev_centroids = centroids.clone();
        let mut empty_clusters = Vec::new();

        for cluster_idx in 0..k {
            let count = cluster_counts[cluster_idx];
            if count > 0 {
                let mean = &cluster_sums.row(cluster_idx) / count as f64;
                centroids.row_mut(cluster_idx).assign(&mean);
            } else {
                empty_clusters.push(cluster_idx);
            }
        }

        if !empty_clusters.is_empty() {
            match config.empty_cluster {
                EmptyClusterPolicy::Fail => {
                    return Err(ClusterError::EmptyCluster {
                        cluster: empty_clusters[0],
                        iteration,
                    });
                }
                EmptyClusterPolicy::Reseed => {
                    reseed_empty_clusters(data, &mut centroids, &empty_clusters, rng);
                    warn!(
                        iteration,
                        clusters = ?empty_clusters,
                        "Reseeded empty clusters from random points"
                    );
                }
            }
        }

        let shift = mean_absolute_shift(&prev_centroids.view(), &centroids.view());
        shift_history.push(shift);
        state.record(shift);

        debug!(
            iteration,
            max_iters = config.max_iters,
            shift,
            inertia,
            "k-means iteration"
        );

        if state.value_within(config.tol) {
            termination = Termination::Converged;
            break;
        }
    }

    info!(
        iterations = state.iteration(),
        ?termination,
        shift = state.current(),
        "k-means finished"
    );

    Ok(KMeansResult {
        centroids,
        labels,
        n_iterations: state.iteration(),
        termination,
        inertia_history,
        shift_history,
    })
}

/// Sum coordinates and count members per cluster, in point order
fn accumulate_clusters(
    data: &ArrayView2<f64>,
    labels: &ArrayView1<usize>,
    k: usize,
) -> (Array2<f64>, Vec<usize>) {
    let mut cluster_sums = Array2::zeros((k, data.ncols()));
    let mut cluster_counts = vec![0usize; k];

    for (point, &label) in data.outer_iter().zip(labels.iter()) {
        let mut row = cluster_sums.row_mut(label);
        row += &point;
        cluster_counts[label] += 1;
    }

    (cluster_sums, cluster_counts)
}

/// Within-cluster sum of squared distances for a given assignment
pub fn compute_inertia(
    data: &ArrayView2<f64>,
    labels: &ArrayView1<usize>,
    centroids: &ArrayView2<f64>,
) -> f64 {
    data.outer_iter()
        .zip(labels.iter())
        .map(|(point, &label)| squared_distance(&point, &centroids.row(label)))
        .sum()
}

/// Initialize centroids by randomly selecting k distinct data points
fn initialize_centroids<R: Rng + ?Sized>(data: &ArrayView2<f64>, k: usize, rng: &mut R) -> Array2<f64> {
    let indices: Vec<usize> = (0..data.nrows()).collect();
    let selected: Vec<usize> = indices.choose_multiple(rng, k).cloned().collect();

    let mut centroids = Array2::zeros((k, data.ncols()));
    for (centroid_idx, &data_idx) in selected.iter().enumerate() {
        centroids.row_mut(centroid_idx).assign(&data.row(data_idx));
    }

    centroids
}

/// Initialize centroids with k-means++ seeding
fn initialize_centroids_plus_plus<R: Rng + ?Sized>(
    data: &ArrayView2<f64>,
    k: usize,
    rng: &mut R,
) -> Array2<f64> {
    let n_samples = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));

    let first = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&data.row(first));

    // Squared distance of every point to its nearest chosen centroid
    let mut distances: Vec<f64> = data
        .outer_iter()
        .map(|point| squared_distance(&point, &centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = distances.iter().sum();

        let selected = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut chosen = None;
            for (j, &d) in distances.iter().enumerate() {
                cumsum += d;
                if d > 0.0 && cumsum >= threshold {
                    chosen = Some(j);
                    break;
                }
            }
            chosen.unwrap_or_else(|| {
                distances
                    .iter()
                    .rposition(|&d| d > 0.0)
                    .unwrap_or(n_samples - 1)
            })
        } else {
            // Every point coincides with a chosen centroid
            rng.gen_range(0..n_samples)
        };

        centroids.row_mut(c).assign(&data.row(selected));

        for (dist, point) in distances.iter_mut().zip(data.outer_iter()) {
            let d = squared_distance(&point, &centroids.row(c));
            if d < *dist {
                *dist = d;
            }
        }
    }

    centroids
}

/// Move every empty cluster's centroid onto a distinct random data point
fn reseed_empty_clusters<R: Rng + ?Sized>(
    data: &ArrayView2<f64>,
    centroids: &mut Array2<f64>,
    empty_clusters: &[usize],
    rng: &mut R,
) {
    let indices: Vec<usize> = (0..data.nrows()).collect();
    let random_indices: Vec<usize> = indices
        .choose_multiple(rng, empty_clusters.len())
        .cloned()
        .collect();

    for (&cluster_idx, &data_idx) in empty_clusters.iter().zip(random_indices.iter()) {
        centroids.row_mut(cluster_idx).assign(&data.row(data_idx));
    }
}
