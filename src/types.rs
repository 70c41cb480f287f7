use crate::index::{order_from_strict_len, strict_len};
use crate::packed::PackedSymmetric;
use ndarray::Array2;
use std::fmt;

// ─────────────────────────────────────────────────────────────
//  Error type
// ─────────────────────────────────────────────────────────────

/// Why a scaling run or one of its kernels gave up.
///
/// Malformed input is rejected before any iteration starts; numerical
/// failures from the linear-algebra backends surface where they occur.
/// `ffi` maps every variant to status 1 and keeps its `Display` text for
/// `smacof_last_error`.
#[derive(Debug)]
pub enum SmacofError {
    /// Sparse factorisation failure inside the SPD solver.
    Linalg(sprs::errors::LinalgError),
    /// LDLᵀ factorisation produced a non-positive pivot.
    NotPositiveDefinite { index: usize, pivot: f64 },
    /// Symmetric eigendecomposition did not converge or saw non-finite input.
    Eigen(String),
    /// A packed length is not a triangular number `n(n-1)/2` with n ≥ 2.
    NotTriangular { len: usize },
    /// Shape mismatch in input data.
    Shape(String),
    /// Argument outside its valid domain (negative tolerance, p > n, …).
    InvalidArgument(String),
    /// Integer width conversion at the native boundary would truncate.
    Overflow { value: i128, target: &'static str },
    /// Argmin solver returned an error.
    Solver(String),
}

impl fmt::Display for SmacofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linalg(e) => write!(f, "linear algebra error: {e}"),
            Self::NotPositiveDefinite { index, pivot } =>
                write!(f, "matrix is not positive definite: pivot {index} = {pivot:e}"),
            Self::Eigen(msg) => write!(f, "eigendecomposition failed: {msg}"),
            Self::NotTriangular { len } =>
                write!(f, "packed length {len} is not n(n-1)/2 for any n >= 2"),
            Self::Shape(msg) => write!(f, "shape error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Overflow { value, target } =>
                write!(f, "value {value} does not fit in {target}"),
            Self::Solver(msg) => write!(f, "solver error: {msg}"),
        }
    }
}

impl std::error::Error for SmacofError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Linalg(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sprs::errors::LinalgError> for SmacofError {
    fn from(e: sprs::errors::LinalgError) -> Self {
        Self::Linalg(e)
    }
}

impl From<argmin::core::Error> for SmacofError {
    fn from(e: argmin::core::Error) -> Self {
        Self::Solver(e.to_string())
    }
}

pub type SmacofResult<T> = Result<T, SmacofError>;

// ─────────────────────────────────────────────────────────────
//  Constants
// ─────────────────────────────────────────────────────────────

/// Eigenvalues at or below this are treated as zero by `mpower`.
pub const EIGEN_ZERO_TOL: f64 = 1e-10;

/// Cubed distances below this contribute nothing to the Hessian.
pub const HESSIAN_DIST_TOL: f64 = 1e-10;

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

// ─────────────────────────────────────────────────────────────
//  Solver options
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SmacofOptions {
    /// Upper bound on Guttman iterations (`itmax`, at least 1).
    pub max_iterations: usize,
    /// Sup-norm change of the configuration below which the run stops.
    pub tolerance: f64,
    /// Record σ after every iteration in `SmacofOutput::stress_history`.
    pub record_history: bool,
}

impl Default for SmacofOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            record_history: true,
        }
    }
}

impl SmacofOptions {
    pub fn validate(&self) -> SmacofResult<()> {
        if self.max_iterations == 0 {
            return Err(SmacofError::InvalidArgument(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SmacofError::InvalidArgument(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Settings for the optional L-BFGS polish after majorization.
#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub max_iterations: usize,
    /// Number of L-BFGS correction pairs.
    pub memory: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            memory: 10,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Problem definition  (immutable after construction)
// ─────────────────────────────────────────────────────────────

/// Dissimilarities, weights and target dimensionality for one scaling run.
#[derive(Debug, Clone)]
pub struct SmacofProblem {
    /// δ, strict-lower packed, length n(n-1)/2.
    pub delta: Vec<f64>,
    /// w, same shape as δ.
    pub weights: Vec<f64>,
    /// Number of objects.
    pub n: usize,
    /// Embedding dimension.
    pub p: usize,
}

impl SmacofProblem {
    /// Unit-weighted problem.  Derives `n` from `delta.len()`.
    pub fn new(delta: Vec<f64>, p: usize) -> SmacofResult<Self> {
        let m = delta.len();
        Self::with_weights(delta, vec![1.0; m], p)
    }

    pub fn with_weights(delta: Vec<f64>, weights: Vec<f64>, p: usize) -> SmacofResult<Self> {
        let m = delta.len();
        let n = order_from_strict_len(m).ok_or(SmacofError::NotTriangular { len: m })?;
        if weights.len() != m {
            return Err(SmacofError::Shape(format!(
                "weights have length {}, dissimilarities {m}",
                weights.len()
            )));
        }
        if p == 0 {
            return Err(SmacofError::InvalidArgument("dimension p must be at least 1".into()));
        }
        check_nonnegative("dissimilarity", &delta)?;
        check_nonnegative("weight", &weights)?;
        Ok(Self { delta, weights, n, p })
    }

    /// Number of pairs m.
    pub fn num_pairs(&self) -> usize {
        strict_len(self.n)
    }
}

fn check_nonnegative(what: &str, v: &[f64]) -> SmacofResult<()> {
    match v.iter().position(|&x| !x.is_finite() || x < 0.0) {
        Some(k) => Err(SmacofError::InvalidArgument(format!(
            "{what} {k} is {} (must be finite and >= 0)",
            v[k]
        ))),
        None => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────
//  Per-run working state
// ─────────────────────────────────────────────────────────────

/// All mutable buffers of a single majorization run.  Built at the start
/// of `optimizer::smacof`, dropped when it returns.
#[derive(Debug)]
pub struct RunState {
    pub x_old: Array2<f64>,
    pub d_old: Vec<f64>,
    pub b_old: PackedSymmetric,
    pub stress_old: f64,

    pub x_new: Array2<f64>,
    pub d_new: Vec<f64>,
    pub b_new: PackedSymmetric,
    pub stress_new: f64,

    /// Pseudo-inverse of V, fixed for the run.
    pub vpinv: PackedSymmetric,

    pub iteration: usize,
    pub converged: bool,
    pub stress_history: Vec<f64>,
}

// ─────────────────────────────────────────────────────────────
//  Solver output
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SmacofOutput {
    /// Final configuration, n × p.
    pub configuration: Array2<f64>,
    /// Number of Guttman iterations performed.
    pub iterations: usize,
    /// σ at `configuration`.
    pub stress: f64,
    /// True when the sup-norm change dropped below the tolerance.
    pub converged: bool,
    /// σ at the start configuration followed by σ after each iteration
    /// (empty unless `record_history`).
    pub stress_history: Vec<f64>,
}

impl SmacofOutput {
    /// Configuration as a flat column-major buffer (the C layout).
    pub fn column_major(&self) -> Vec<f64> {
        crate::optimizer::configuration_to_column_major(&self.configuration)
    }
}
