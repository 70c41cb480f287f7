//! SMACOF iteration driver, plus an optional L-BFGS polish via `argmin`.
//!
//! The driver owns every buffer of a run (`RunState`):
//!
//!   1. X0 from the caller or from classical scaling
//!   2. d(X0), σ(X0), B(X0)
//!   3. V and V⁺ once
//!   4. repeat  X⁺ = V⁺ B X,  until  max|X − X⁺| < eps  or  itmax
//!
//! The Guttman step never increases σ, so the loop needs no line search.
//! `refine` hands the result to L-BFGS with the analytic gradient, which
//! can speed up the slow tail of majorization.

use crate::distance::{distances, raw_loss};
use crate::index::order_from_strict_len;
use crate::initial::initial_configuration;
use crate::majorize::{bmat, gradient, update, vmat};
use crate::packed::PackedSymmetric;
use crate::power::pseudo_inverse;
use crate::types::{
    RefineOptions, RunState, SmacofError, SmacofOptions, SmacofOutput, SmacofProblem,
    SmacofResult,
};
use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::{debug, info};
use ndarray::{Array2, ShapeBuilder};

// ─────────────────────────────────────────────────────────────
//  Flat buffer helpers
// ─────────────────────────────────────────────────────────────

/// View a column-major flat buffer as an n × p configuration.
pub fn configuration_from_column_major(
    values: &[f64],
    n: usize,
    p: usize,
) -> SmacofResult<Array2<f64>> {
    Array2::from_shape_vec((n, p).f(), values.to_vec()).map_err(|_| {
        SmacofError::Shape(format!(
            "configuration has {} values, expected {n}×{p} = {}",
            values.len(),
            n * p
        ))
    })
}

/// Flatten an n × p configuration column by column.
pub fn configuration_to_column_major(x: &Array2<f64>) -> Vec<f64> {
    x.t().iter().copied().collect()
}

/// max |a − b| over all entries.
fn sup_norm_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0_f64, |m, (x, y)| m.max((x - y).abs()))
}

// ─────────────────────────────────────────────────────────────
//  Entry points
// ─────────────────────────────────────────────────────────────

/// Unit-weighted SMACOF on a packed dissimilarity vector.
///
/// `x0`, when given, is a column-major n × p buffer; otherwise the start
/// comes from classical scaling.
pub fn run(
    delta: &[f64],
    p: usize,
    max_iterations: usize,
    tolerance: f64,
    x0: Option<&[f64]>,
) -> SmacofResult<SmacofOutput> {
    let problem = SmacofProblem::new(delta.to_vec(), p)?;
    let start = match x0 {
        Some(values) => Some(configuration_from_column_major(values, problem.n, p)?),
        None => None,
    };
    let options = SmacofOptions {
        max_iterations,
        tolerance,
        ..SmacofOptions::default()
    };
    smacof(&problem, start, &options)
}

/// Run majorization on `problem` from `x0` (or classical scaling).
pub fn smacof(
    problem: &SmacofProblem,
    x0: Option<Array2<f64>>,
    options: &SmacofOptions,
) -> SmacofResult<SmacofOutput> {
    options.validate()?;
    let (n, p) = (problem.n, problem.p);
    let (w, delta) = (&problem.weights, &problem.delta);

    let x_old = match x0 {
        Some(x) => {
            if x.dim() != (n, p) {
                return Err(SmacofError::Shape(format!(
                    "initial configuration is {:?}, expected ({n}, {p})",
                    x.dim()
                )));
            }
            if x.iter().any(|v| !v.is_finite()) {
                return Err(SmacofError::InvalidArgument(
                    "initial configuration has non-finite entries".into(),
                ));
            }
            x
        }
        None => initial_configuration(delta, n, p)?,
    };

    let d_old = distances(&x_old);
    let stress_old = raw_loss(&d_old, w, delta);
    let b_old = bmat(&d_old, w, delta, n)?;
    let vpinv = pseudo_inverse(&vmat(w, n)?)?;

    let mut state = RunState {
        x_new: Array2::zeros((n, p).f()),
        d_new: vec![0.0; d_old.len()],
        b_new: PackedSymmetric::zeros(n),
        stress_new: stress_old,
        x_old,
        d_old,
        b_old,
        stress_old,
        vpinv,
        iteration: 0,
        converged: false,
        stress_history: Vec::new(),
    };
    if options.record_history {
        state.stress_history.push(stress_old);
    }
    debug!("smacof: n={n} p={p} initial stress={stress_old:.6e}");

    loop {
        state.iteration += 1;
        let step = update(&state.x_old, &state.b_old, &state.vpinv, w, delta)?;
        let change = sup_norm_diff(&state.x_old, &step.x);
        state.x_new = step.x;
        state.d_new = step.d;
        state.b_new = step.b;
        state.stress_new = step.stress;
        if options.record_history {
            state.stress_history.push(state.stress_new);
        }
        debug!(
            "smacof iter {}: stress={:.6e} (Δ {:+.3e}), max|ΔX|={:.3e}",
            state.iteration,
            state.stress_new,
            state.stress_new - state.stress_old,
            change
        );

        if change < options.tolerance {
            state.converged = true;
            break;
        }
        if state.iteration == options.max_iterations {
            break;
        }

        std::mem::swap(&mut state.x_old, &mut state.x_new);
        std::mem::swap(&mut state.d_old, &mut state.d_new);
        std::mem::swap(&mut state.b_old, &mut state.b_new);
        state.stress_old = state.stress_new;
    }

    info!(
        "smacof {} after {} iterations, stress={:.6e}",
        if state.converged { "converged" } else { "stopped at iteration cap" },
        state.iteration,
        state.stress_new
    );

    Ok(SmacofOutput {
        configuration: state.x_new,
        iterations: state.iteration,
        stress: state.stress_new,
        converged: state.converged,
        stress_history: state.stress_history,
    })
}

// ─────────────────────────────────────────────────────────────
//  argmin problem wrapper  (L-BFGS refinement)
// ─────────────────────────────────────────────────────────────

/// σ as an argmin problem over the column-major flattened configuration.
///
/// `Vec<f64>` is the parameter type so argmin-math's `vec` backend does
/// the vector algebra; the kernel itself works on `Array2`.
struct StressFunction<'a> {
    problem: &'a SmacofProblem,
    v: PackedSymmetric,
}

impl StressFunction<'_> {
    fn unflatten(&self, theta: &[f64]) -> Result<Array2<f64>, argmin::core::Error> {
        configuration_from_column_major(theta, self.problem.n, self.problem.p)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl CostFunction for StressFunction<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let x = self.unflatten(theta)?;
        let d = distances(&x);
        Ok(raw_loss(&d, &self.problem.weights, &self.problem.delta))
    }
}

impl Gradient for StressFunction<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let x = self.unflatten(theta)?;
        let d = distances(&x);
        let b = bmat(&d, &self.problem.weights, &self.problem.delta, self.problem.n)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))?;
        let g = gradient(&x, &b, &self.v).map_err(|e| argmin::core::Error::msg(e.to_string()))?;
        Ok(configuration_to_column_major(&g))
    }
}

/// Polish a configuration with L-BFGS (More–Thuente line search) on σ.
///
/// The returned output never has higher stress than `start`; when L-BFGS
/// does not improve, `start` comes back unchanged apart from `iterations`.
pub fn refine(
    problem: &SmacofProblem,
    start: &SmacofOutput,
    options: &RefineOptions,
) -> SmacofResult<SmacofOutput> {
    let (n, p) = (problem.n, problem.p);
    if start.configuration.dim() != (n, p) {
        return Err(SmacofError::Shape(format!(
            "start configuration is {:?}, expected ({n}, {p})",
            start.configuration.dim()
        )));
    }
    if options.memory == 0 {
        return Err(SmacofError::InvalidArgument("L-BFGS memory must be at least 1".into()));
    }
    if order_from_strict_len(problem.delta.len()) != Some(n) {
        return Err(SmacofError::NotTriangular { len: problem.delta.len() });
    }

    let start_stress = {
        let d = distances(&start.configuration);
        raw_loss(&d, &problem.weights, &problem.delta)
    };
    let init_param = configuration_to_column_major(&start.configuration);

    let stress_fn = StressFunction {
        problem,
        v: vmat(&problem.weights, n)?,
    };

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, options.memory);

    let executor = Executor::new(stress_fn, solver).configure(|config| {
        config
            .param(init_param)
            .max_iters(options.max_iterations as u64)
            .target_cost(f64::NEG_INFINITY)
    });

    let result = executor.run()?;

    let best_param = result
        .state()
        .get_best_param()
        .ok_or_else(|| SmacofError::Solver("L-BFGS returned no best parameters".into()))?;
    let best_cost = result.state().get_best_cost();
    let iterations = result.state().get_iter() as usize;
    let converged = matches!(
        result.state().get_termination_reason(),
        Some(TerminationReason::SolverConverged)
    );

    let mut out = start.clone();
    out.iterations = start.iterations + iterations;
    if best_cost.is_finite() && best_cost < start_stress {
        out.configuration = configuration_from_column_major(best_param, n, p)?;
        out.stress = best_cost;
        out.converged = converged;
        if !out.stress_history.is_empty() {
            out.stress_history.push(best_cost);
        }
    }
    info!(
        "refine: {iterations} L-BFGS iterations, stress {start_stress:.6e} -> {:.6e}",
        out.stress
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_round_trip_is_column_major() {
        let flat = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = configuration_from_column_major(&flat, 3, 2).unwrap();
        assert_eq!(x[[0, 1]], 4.0);
        assert_eq!(x[[2, 0]], 3.0);
        assert_eq!(configuration_to_column_major(&x), flat);
        assert!(configuration_from_column_major(&flat, 4, 2).is_err());
    }

    #[test]
    fn output_flattens_like_the_helper() {
        let problem = SmacofProblem::new(vec![1.0, 2.0, 2.5], 2).unwrap();
        let out = smacof(&problem, None, &SmacofOptions::default()).unwrap();
        let flat = out.column_major();
        assert_eq!(flat, configuration_to_column_major(&out.configuration));
        assert_eq!(flat[3], out.configuration[[0, 1]]);
        assert_eq!(configuration_from_column_major(&flat, 3, 2).unwrap(), out.configuration);
    }

    #[test]
    fn sup_norm_takes_largest_entry() {
        let a = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let b = Array2::from_shape_vec((2, 2), vec![0.5, 1.0, -1.0, 3.0]).unwrap();
        assert_relative_eq!(sup_norm_diff(&a, &b), 3.0);
    }

    #[test]
    fn options_are_validated() {
        let problem = SmacofProblem::new(vec![1.0, 1.0, 1.0], 2).unwrap();
        let bad = SmacofOptions { max_iterations: 0, ..SmacofOptions::default() };
        assert!(smacof(&problem, None, &bad).is_err());
        let bad = SmacofOptions { tolerance: -1.0, ..SmacofOptions::default() };
        assert!(smacof(&problem, None, &bad).is_err());
    }

    #[test]
    fn start_shape_is_checked() {
        let problem = SmacofProblem::new(vec![1.0, 1.0, 1.0], 2).unwrap();
        let x0 = Array2::zeros((2, 2));
        assert!(smacof(&problem, Some(x0), &SmacofOptions::default()).is_err());
    }
}
