use crate::config::GmmConfig;
use crate::convergence::Termination;
use crate::density::Gaussian;
use crate::em::{gmm_em, GmmResult};
use crate::error::{ClusterError, Result};
use crate::linalg::eigh;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Gaussian Mixture Model with full covariances, fitted by EM.
///
/// # Example
///
/// ```
/// use emcluster_rs::{GaussianMixture, GmmConfig};
/// use ndarray::array;
///
/// let data = array![
///     [0.0, 0.0], [0.3, 0.1], [0.1, 0.4], [0.4, 0.3],
///     [8.0, 8.0], [8.2, 8.3], [8.4, 8.1], [8.1, 8.5],
/// ];
///
/// let mut gmm = GaussianMixture::with_config(GmmConfig::new(2).with_seed(7));
/// let model = gmm.fit(&data.view()).unwrap();
///
/// let weights: f64 = model.weights().sum();
/// assert!((weights - 1.0).abs() < 1e-9);
/// ```
pub struct GaussianMixture {
    /// Model configuration
    config: GmmConfig,

    /// Fitted model (None if not yet fitted)
    model: Option<GmmModel>,
}

impl GaussianMixture {
    /// Create a new mixture with default configuration and `k` components.
    pub fn new(k: usize) -> Self {
        Self::with_config(GmmConfig::new(k))
    }

    /// Create a new mixture with custom configuration.
    pub fn with_config(config: GmmConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Fit the mixture, seeding a `ChaCha8Rng` from `config.seed`.
    ///
    /// # Errors
    ///
    /// Besides input validation errors, a fit fails with:
    /// - `SingularMatrix` when a component covariance stops being invertible
    /// - `NotPositiveDefinite` when a covariance determinant turns negative
    /// - `DegenerateMixture` when every weighted density vanishes for some point
    pub fn fit(&mut self, data: &ArrayView2<f64>) -> Result<&GmmModel> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.fit_with_rng(data, &mut rng)
    }

    /// Fit the mixture drawing all randomness from `rng`.
    pub fn fit_with_rng<R: Rng + ?Sized>(
        &mut self,
        data: &ArrayView2<f64>,
        rng: &mut R,
    ) -> Result<&GmmModel> {
        let result = gmm_em(data, &self.config, rng)?;
        Ok(&*self.model.insert(GmmModel::from(result)))
    }

    /// Most probable component of each row of `data`.
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        self.model
            .as_ref()
            .ok_or(ClusterError::NotFitted)?
            .predict(data)
    }

    /// Fit the mixture and predict the component of every training point.
    pub fn fit_predict(&mut self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        self.fit(data)?.predict(data)
    }

    pub fn model(&self) -> Option<&GmmModel> {
        self.model.as_ref()
    }

    pub fn into_model(self) -> Option<GmmModel> {
        self.model
    }

    pub fn k(&self) -> usize {
        self.config.k
    }

    pub fn config(&self) -> &GmmConfig {
        &self.config
    }
}

/// Principal axes of a component's covariance, major axis first
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalAxes {
    /// Standard deviation along each axis (square roots of the eigenvalues)
    pub std_devs: Array1<f64>,
    /// Unit direction of each axis, one per column
    pub directions: Array2<f64>,
}

/// Covariance ellipse of a two-dimensional component
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub center: [f64; 2],
    /// Full length along the major axis
    pub width: f64,
    /// Full length along the minor axis
    pub height: f64,
    /// Counter-clockwise rotation of the major axis from the x axis, in degrees
    pub angle_degrees: f64,
}

/// A fitted Gaussian Mixture Model. Read-only once produced.
#[derive(Debug, Clone)]
pub struct GmmModel {
    means: Array2<f64>,
    covariances: Vec<Array2<f64>>,
    weights: Array1<f64>,
    responsibilities: Array2<f64>,
    components: Vec<Gaussian>,
    log_likelihood: f64,
    log_likelihood_history: Vec<f64>,
    n_iterations: usize,
    termination: Termination,
}

impl From<GmmResult> for GmmModel {
    fn from(result: GmmResult) -> Self {
        Self {
            means: result.means,
            covariances: result.covariances,
            weights: result.weights,
            responsibilities: result.responsibilities,
            components: result.components,
            log_likelihood: result.log_likelihood,
            log_likelihood_history: result.log_likelihood_history,
            n_iterations: result.n_iterations,
            termination: result.termination,
        }
    }
}

impl GmmModel {
    /// Component means, one row per component
    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    pub fn covariances(&self) -> &[Array2<f64>] {
        &self.covariances
    }

    /// Mixture weights; they sum to one
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// N×K responsibilities of the training points; every row sums to one
    pub fn responsibilities(&self) -> &Array2<f64> {
        &self.responsibilities
    }

    /// Log-likelihood of the training data under the final parameters
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Log-likelihood recorded after every EM iteration
    pub fn log_likelihood_history(&self) -> &[f64] {
        &self.log_likelihood_history
    }

    pub fn n_iterations(&self) -> usize {
        self.n_iterations
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn k(&self) -> usize {
        self.means.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.means.ncols()
    }

    fn check_features(&self, data: &ArrayView2<f64>) -> Result<()> {
        if data.ncols() != self.n_features() {
            return Err(ClusterError::InvalidDimensions(format!(
                "Expected {} features, got {}",
                self.n_features(),
                data.ncols()
            )));
        }
        Ok(())
    }

    fn check_component(&self, component: usize) -> Result<()> {
        if component >= self.k() {
            return Err(ClusterError::InvalidParameter(format!(
                "Component index {} out of range for k = {}",
                component,
                self.k()
            )));
        }
        Ok(())
    }

    /// `ln(weight_k) + ln N(x | mean_k, cov_k)` for every component
    fn weighted_log_densities(&self, point: &ArrayView1<f64>) -> Vec<f64> {
        self.components
            .iter()
            .zip(self.weights.iter())
            .map(|(g, &w)| w.ln() + g.log_pdf(point))
            .collect()
    }

    /// Label each row of `data` with the component maximizing
    /// `weight_k · N(x | mean_k, cov_k)`. Ties go to the lowest index.
    ///
    /// The comparison is made on log densities, which ranks components the
    /// same way without underflowing for points far from every mean.
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        self.check_features(data)?;

        let labels: Vec<usize> = (0..data.nrows())
            .into_par_iter()
            .map(|i| {
                let scores = self.weighted_log_densities(&data.row(i));
                let mut best = 0;
                for (c, &score) in scores.iter().enumerate() {
                    if score > scores[best] {
                        best = c;
                    }
                }
                best
            })
            .collect();

        Ok(Array1::from(labels))
    }

    /// Posterior component probabilities for each row of `data`
    pub fn predict_proba(&self, data: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_features(data)?;

        let mut proba = Array2::zeros((data.nrows(), self.k()));
        for (i, mut row) in proba.outer_iter_mut().enumerate() {
            let scores = self.weighted_log_densities(&data.row(i));
            let log_total = logsumexp(&scores);
            for (value, score) in row.iter_mut().zip(scores.iter()) {
                *value = (score - log_total).exp();
            }
        }

        Ok(proba)
    }

    /// Principal axes of a component's covariance, largest variance first
    pub fn principal_axes(&self, component: usize) -> Result<PrincipalAxes> {
        self.check_component(component)?;

        let (values, vectors) = eigh(&self.covariances[component].view())?;
        let d = values.len();

        let mut std_devs = Array1::zeros(d);
        let mut directions = Array2::zeros((d, d));
        for (dst, src) in (0..d).rev().enumerate() {
            // Clamp rounding noise on nearly flat directions
            std_devs[dst] = values[src].max(0.0).sqrt();
            directions.column_mut(dst).assign(&vectors.column(src));
        }

        Ok(PrincipalAxes {
            std_devs,
            directions,
        })
    }

    /// Covariance ellipse of a 2-D component spanning `n_std` standard
    /// deviations on each side of the mean.
    pub fn ellipse(&self, component: usize, n_std: f64) -> Result<Ellipse> {
        if self.n_features() != 2 {
            return Err(ClusterError::InvalidDimensions(format!(
                "Ellipses need 2 features, model has {}",
                self.n_features()
            )));
        }

        let axes = self.principal_axes(component)?;
        let major = axes.directions.column(0);

        Ok(Ellipse {
            center: [self.means[[component, 0]], self.means[[component, 1]]],
            width: 2.0 * n_std * axes.std_devs[0],
            height: 2.0 * n_std * axes.std_devs[1],
            angle_degrees: major[1].atan2(major[0]).to_degrees(),
        })
    }

    /// Row index of the point in `data` with the highest density under each
    /// component. Ties go to the lowest row index.
    pub fn representative_points(&self, data: &ArrayView2<f64>) -> Result<Vec<usize>> {
        self.check_features(data)?;
        if data.nrows() == 0 {
            return Err(ClusterError::InsufficientData(
                "No points to choose from".to_string(),
            ));
        }

        Ok(self
            .components
            .iter()
            .map(|g| {
                let mut best = 0;
                let mut best_score = f64::NEG_INFINITY;
                for (i, point) in data.outer_iter().enumerate() {
                    let score = g.log_pdf(&point);
                    if score > best_score {
                        best_score = score;
                        best = i;
                    }
                }
                best
            })
            .collect())
    }
}

/// Log-sum-exp for numerical stability.
fn logsumexp(values: &[f64]) -> f64 {
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.5, 0.2],
            [0.1, 0.6],
            [0.6, 0.5],
            [0.3, 0.3],
            [9.0, 9.0],
            [9.5, 9.2],
            [9.1, 9.6],
            [9.6, 9.5],
            [9.3, 9.3],
        ]
    }

    fn fitted() -> GmmModel {
        let mut gmm = GaussianMixture::with_config(
            GmmConfig::new(2).with_seed(5).with_max_iters(200).with_tol(1e-10),
        );
        gmm.fit(&two_blobs().view()).unwrap();
        gmm.into_model().unwrap()
    }

    #[test]
    fn test_gmm_new() {
        let gmm = GaussianMixture::new(4);
        assert_eq!(gmm.k(), 4);
        assert_eq!(gmm.config().tol, 0.01);
        assert!(gmm.model().is_none());
    }

    #[test]
    fn test_gmm_fit_invariants() {
        let model = fitted();

        assert_eq!(model.means().dim(), (2, 2));
        assert_eq!(model.covariances().len(), 2);
        assert_relative_eq!(model.weights().sum(), 1.0, epsilon = 1e-9);
        for row in model.responsibilities().outer_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(model.log_likelihood_history().len(), model.n_iterations());
        assert_eq!(
            *model.log_likelihood_history().last().unwrap(),
            model.log_likelihood()
        );
    }

    #[test]
    fn test_gmm_predict_separates_blobs() {
        let model = fitted();
        let labels = model.predict(&two_blobs().view()).unwrap();

        for i in 1..5 {
            assert_eq!(labels[i], labels[0]);
            assert_eq!(labels[i + 5], labels[5]);
        }
        assert_ne!(labels[0], labels[5]);

        // Far away points still get a label
        let far = array![[-1e4, -1e4], [1e4, 1e4]];
        let far_labels = model.predict(&far.view()).unwrap();
        assert_eq!(far_labels.len(), 2);
    }

    #[test]
    fn test_gmm_predict_proba() {
        let model = fitted();
        let proba = model.predict_proba(&two_blobs().view()).unwrap();
        let labels = model.predict(&two_blobs().view()).unwrap();

        for (row, &label) in proba.outer_iter().zip(labels.iter()) {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
            assert!(row[label] >= 0.5);
        }
    }

    #[test]
    fn test_gmm_predict_before_fit() {
        let gmm = GaussianMixture::new(2);
        assert!(matches!(
            gmm.predict(&two_blobs().view()),
            Err(ClusterError::NotFitted)
        ));
    }

    #[test]
    fn test_gmm_dimension_mismatch() {
        let model = fitted();
        let query = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            model.predict(&query.view()),
            Err(ClusterError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_principal_axes_and_ellipse() {
        let model = fitted();

        for c in 0..2 {
            let axes = model.principal_axes(c).unwrap();
            assert!(axes.std_devs[0] >= axes.std_devs[1]);

            let cov = &model.covariances()[c];
            let major = axes.directions.column(0);
            let variance = major.dot(&cov.dot(&major));
            assert_relative_eq!(variance, axes.std_devs[0].powi(2), epsilon = 1e-9);

            let ellipse = model.ellipse(c, 2.0).unwrap();
            assert_relative_eq!(ellipse.width, 4.0 * axes.std_devs[0], epsilon = 1e-12);
            assert_relative_eq!(ellipse.height, 4.0 * axes.std_devs[1], epsilon = 1e-12);
            assert_eq!(ellipse.center[0], model.means()[[c, 0]]);
        }

        assert!(matches!(
            model.principal_axes(2),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_representative_points() {
        let data = two_blobs();
        let model = fitted();
        let reps = model.representative_points(&data.view()).unwrap();
        let labels = model.predict(&data.view()).unwrap();

        assert_eq!(reps.len(), 2);
        for (c, &row) in reps.iter().enumerate() {
            assert_eq!(labels[row], c);
        }
    }

    #[test]
    fn test_logsumexp() {
        assert_relative_eq!(logsumexp(&[0.0, 0.0]), 2.0f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(logsumexp(&[-1000.0, -1000.0]), -1000.0 + 2.0f64.ln(), epsilon = 1e-9);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }
}
