use crate::algorithm::validate_points;
use crate::config::GmmConfig;
use crate::convergence::{ConvergenceState, Termination};
use crate::density::Gaussian;
use crate::error::{ClusterError, Result};
use crate::linalg::outer_product;
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

/// Result of the EM algorithm
pub struct GmmResult {
    pub means: Array2<f64>,
    pub covariances: Vec<Array2<f64>>,
    pub weights: Array1<f64>,
    pub responsibilities: Array2<f64>,
    /// Densities built from the final parameters
    pub components: Vec<Gaussian>,
    pub log_likelihood: f64,
    pub log_likelihood_history: Vec<f64>,
    pub n_iterations: usize,
    pub termination: Termination,
}

/// Parameters of one mixture component as produced by an M-step
#[derive(Debug, Clone)]
pub struct ComponentEstimate {
    pub mean: Array1<f64>,
    pub covariance: Array2<f64>,
    pub weight: f64,
}

/// Fit a full-covariance Gaussian mixture by Expectation-Maximization.
///
/// Responsibilities start as a random partition of unity per point. Each
/// iteration re-estimates every component from the current responsibilities
/// (M-step), recomputes responsibilities by Bayes' rule (E-step) and records
/// the log-likelihood. The fit stops once the log-likelihood changes by at most
/// `config.tol`, or after `config.max_iters` iterations.
pub fn gmm_em<R: Rng + ?Sized>(
    data: &ArrayView2<f64>,
    config: &GmmConfig,
    rng: &mut R,
) -> Result<GmmResult> {
    validate_points(data, config.k)?;

    if config.max_iters == 0 {
        return Err(ClusterError::InvalidParameter(
            "max_iters must be greater than 0".to_string(),
        ));
    }

    let (n_samples, n_features) = data.dim();
    let k = config.k;

    debug!(n_samples, n_features, k, "Training GMM");

    let mut responsibilities = initialize_responsibilities(n_samples, k, rng);
    let mut estimates: Vec<ComponentEstimate> = (0..k)
        .map(|_| ComponentEstimate {
            mean: Array1::zeros(n_features),
            covariance: Array2::zeros((n_features, n_features)),
            weight: 0.0,
        })
        .collect();
    let mut components = Vec::new();

    let mut state = ConvergenceState::new();
    let mut history = Vec::new();
    let mut termination = Termination::MaxIterationsReached;

    while !state.exhausted(config.max_iters) {
        let iteration = state.iteration() + 1;

        estimates = estimate_parameters(data, &responsibilities.view())?;
        components = build_components(&estimates)?;
        let weights: Vec<f64> = estimates.iter().map(|e| e.weight).collect();

        let (updated, log_likelihood) = update_responsibilities(data, &components, &weights)?;
        responsibilities = updated;

        history.push(log_likelihood);
        state.record(log_likelihood);

        debug!(
            iteration,
            max_iters = config.max_iters,
            log_likelihood,
            delta = state.current() - state.previous(),
            "EM iteration"
        );

        if state.change_within(config.tol) {
            termination = Termination::Converged;
            break;
        }
    }

    info!(
        iterations = state.iteration(),
        ?termination,
        log_likelihood = state.current(),
        "GMM finished"
    );

    let mut means = Array2::zeros((k, n_features));
    let mut weights = Array1::zeros(k);
    let mut covariances = Vec::with_capacity(k);
    for (c, estimate) in estimates.into_iter().enumerate() {
        means.row_mut(c).assign(&estimate.mean);
        weights[c] = estimate.weight;
        covariances.push(estimate.covariance);
    }

    Ok(GmmResult {
        means,
        covariances,
        weights,
        responsibilities,
        components,
        log_likelihood: state.current(),
        log_likelihood_history: history,
        n_iterations: state.iteration(),
        termination,
    })
}

/// Draw one random partition of unity over `k` components per point.
///
/// Sorted uniform cuts of the unit interval split it into `k` pieces whose
/// lengths are non-negative and sum to one.
pub fn initialize_responsibilities<R: Rng + ?Sized>(
    n_samples: usize,
    k: usize,
    rng: &mut R,
) -> Array2<f64> {
    let mut responsibilities = Array2::zeros((n_samples, k));
    let mut cuts = Vec::with_capacity(k + 1);

    for mut row in responsibilities.outer_iter_mut() {
        cuts.clear();
        cuts.push(0.0);
        cuts.extend((1..k).map(|_| rng.gen::<f64>()));
        cuts.push(1.0);
        cuts[1..k].sort_by(|a, b| a.total_cmp(b));

        for (c, value) in row.iter_mut().enumerate() {
            *value = cuts[c + 1] - cuts[c];
        }
    }

    responsibilities
}

/// M-step: re-estimate every component from the current responsibilities.
///
/// Components are independent and estimated in parallel; each one reads the
/// same responsibility snapshot.
pub fn estimate_parameters(
    data: &ArrayView2<f64>,
    responsibilities: &ArrayView2<f64>,
) -> Result<Vec<ComponentEstimate>> {
    let estimates: Vec<Result<ComponentEstimate>> = (0..responsibilities.ncols())
        .into_par_iter()
        .map(|c| estimate_component(data, responsibilities, c))
        .collect();

    estimates.into_iter().collect()
}

fn estimate_component(
    data: &ArrayView2<f64>,
    responsibilities: &ArrayView2<f64>,
    component: usize,
) -> Result<ComponentEstimate> {
    let (n_samples, n_features) = data.dim();
    let resp = responsibilities.column(component);
    let total: f64 = resp.iter().sum();

    if total < f64::MIN_POSITIVE {
        // No responsibility mass left: the covariance would be 0/0
        debug!(component, "component lost all responsibility mass");
        return Err(ClusterError::SingularMatrix { determinant: 0.0 });
    }

    let mut mean = Array1::zeros(n_features);
    for (point, &r) in data.outer_iter().zip(resp.iter()) {
        mean.scaled_add(r, &point);
    }
    mean /= total;

    let mut covariance = Array2::zeros((n_features, n_features));
    for (point, &r) in data.outer_iter().zip(resp.iter()) {
        let diff = &point - &mean;
        covariance.scaled_add(r, &outer_product(&diff.view(), &diff.view()));
    }
    covariance /= total;

    Ok(ComponentEstimate {
        mean,
        covariance,
        weight: total / n_samples as f64,
    })
}

/// Turn component estimates into evaluable densities
pub fn build_components(estimates: &[ComponentEstimate]) -> Result<Vec<Gaussian>> {
    estimates
        .iter()
        .enumerate()
        .map(|(c, e)| {
            Gaussian::new(&e.mean.view(), &e.covariance.view()).map_err(|err| {
                debug!(component = c, error = %err, "covariance rejected");
                err
            })
        })
        .collect()
}

/// E-step: responsibilities by Bayes' rule, plus the log-likelihood of the
/// data under the same parameters.
///
/// Points are processed in parallel against one immutable parameter snapshot;
/// the log-likelihood is summed afterwards in point order.
pub fn update_responsibilities(
    data: &ArrayView2<f64>,
    components: &[Gaussian],
    weights: &[f64],
) -> Result<(Array2<f64>, f64)> {
    let n_samples = data.nrows();
    let k = components.len();

    let rows: Vec<Result<(Vec<f64>, f64)>> = (0..n_samples)
        .into_par_iter()
        .map(|i| {
            let point = data.row(i);
            let weighted: Vec<f64> = components
                .iter()
                .zip(weights.iter())
                .map(|(g, &w)| w * g.pdf(&point))
                .collect();
            let total: f64 = weighted.iter().sum();

            if !(total >= f64::MIN_POSITIVE && total.is_finite()) {
                return Err(ClusterError::DegenerateMixture { point: i });
            }

            Ok((weighted.iter().map(|w| w / total).collect(), total.ln()))
        })
        .collect();

    let mut responsibilities = Array2::zeros((n_samples, k));
    let mut log_likelihood = 0.0;
    for (i, row) in rows.into_iter().enumerate() {
        let (resp, log_total) = row?;
        for (c, r) in resp.into_iter().enumerate() {
            responsibilities[[i, c]] = r;
        }
        log_likelihood += log_total;
    }

    Ok((responsibilities, log_likelihood))
}
