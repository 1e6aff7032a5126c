/// Why an iterative fit stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The monitored quantity changed by no more than the tolerance
    Converged,
    /// The iteration cap was hit first
    MaxIterationsReached,
}

/// Iteration bookkeeping for a single fit. Created when the fit starts and
/// dropped when it ends.
#[derive(Debug, Clone)]
pub(crate) struct ConvergenceState {
    iteration: usize,
    current: f64,
    previous: f64,
}

impl ConvergenceState {
    pub(crate) fn new() -> Self {
        Self {
            iteration: 0,
            current: f64::INFINITY,
            previous: f64::INFINITY,
        }
    }

    /// Record the value produced by the iteration that just finished
    pub(crate) fn record(&mut self, value: f64) {
        self.iteration += 1;
        self.previous = self.current;
        self.current = value;
    }

    pub(crate) fn iteration(&self) -> usize {
        self.iteration
    }

    pub(crate) fn current(&self) -> f64 {
        self.current
    }

    pub(crate) fn previous(&self) -> f64 {
        self.previous
    }

    /// True once `current` itself is at or below `tol`. Used for error-style
    /// quantities such as the centroid shift.
    pub(crate) fn value_within(&self, tol: f64) -> bool {
        self.current <= tol
    }

    /// True once two consecutive finite values differ by at most `tol`.
    /// Used for objective-style quantities such as the log-likelihood.
    pub(crate) fn change_within(&self, tol: f64) -> bool {
        self.previous.is_finite()
            && self.current.is_finite()
            && (self.current - self.previous).abs() <= tol
    }

    pub(crate) fn exhausted(&self, max_iters: usize) -> bool {
        self.iteration >= max_iters
    }
}
