//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! Each iteration forms the normal equations `J^T J` and `J^T r` with faer,
//! damps the diagonal and solves for the step with a Cholesky factorization,
//! falling back to a QR least-squares solve when the damped matrix is not
//! numerically positive definite.

use std::fmt;
use std::time::{Duration, Instant};

use ndarray::{Array1, Array2};

use crate::error::{Result, SpecFitError};
use crate::problem::Problem;
use crate::utils::linalg::{cholesky_solve, lstsq};
use crate::utils::matrix_convert::{
    faer_to_ndarray, faer_vec_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer,
};

use super::cancel::CancelToken;
use super::config::LmConfig;
use super::convergence::ConvergenceStatus;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations (Jacobian evaluations not included)
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Why the run stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// State carried between iterations.
struct IterState {
    params: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
    iterations: usize,
    func_evals: usize,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,

    cancel: Option<CancelToken>,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the wall-clock budget in milliseconds.
    pub fn with_max_duration_ms(mut self, millis: u64) -> Self {
        self.config.max_duration_ms = Some(millis);
        self
    }

    /// Set whether to calculate and return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    /// Attach a cancellation token polled during the run.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Running out of iterations, time or damping is not an error: the
    /// returned [`LmResult`] carries `success == false` and the matching
    /// [`ConvergenceStatus`]. Errors are reserved for malformed input and
    /// failures raised by the problem itself.
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(SpecFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if initial_params.iter().any(|p| !p.is_finite()) {
            return Err(SpecFitError::InvalidInput(
                "initial parameters must be finite".to_string(),
            ));
        }

        let started = Instant::now();
        let deadline = self.config.max_duration_ms.map(Duration::from_millis);

        let residuals = problem.eval(&initial_params)?;
        if residuals.len() != problem.residual_count() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let cost = sum_of_squares(&residuals);
        let mut state = IterState {
            params: initial_params,
            residuals,
            cost,
            iterations: 0,
            func_evals: 1,
        };
        if !state.cost.is_finite() {
            return self.finish(problem, state, ConvergenceStatus::NumericalError);
        }

        let mut lambda = self.config.initial_lambda;

        loop {
            if let Some(status) = self.interrupted(started, deadline) {
                return self.finish(problem, state, status);
            }

            let jacobian = problem.jacobian(&state.params)?;
            let j = ndarray_to_faer(&jacobian);
            let r = ndarray_vec_to_faer(&state.residuals);

            // Gradient of cost/2: g = J^T r
            let g = j.transpose() * &r;
            let gradient_norm = g.norm_l2();
            if !gradient_norm.is_finite() {
                return self.finish(problem, state, ConvergenceStatus::NumericalError);
            }
            if gradient_norm < self.config.gtol {
                return self.finish(problem, state, ConvergenceStatus::GradientConvergence);
            }
            if state.iterations >= self.config.max_iterations {
                return self.finish(problem, state, ConvergenceStatus::MaxIterationsReached);
            }

            let jtj = faer_to_ndarray(&(j.transpose() * &j));
            let jtr = faer_vec_to_ndarray(&g);

            // Increase damping until a downhill step is found
            loop {
                if let Some(status) = self.interrupted(started, deadline) {
                    return self.finish(problem, state, status);
                }

                let step = match self.calculate_step(&jtj, &jtr, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda > self.config.max_lambda {
                            let status = ConvergenceStatus::DampingSaturated;
                            return self.finish(problem, state, status);
                        }
                        continue;
                    }
                };

                let new_params = &state.params + &step;
                let new_residuals = problem.eval(&new_params)?;
                state.func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                // Cost predicted by the linearized model at the trial point
                let linearized = &state.residuals + &jacobian.dot(&step);
                let predicted_cost = sum_of_squares(&linearized);

                let scale = state.cost.max(f64::MIN_POSITIVE);
                let actual_reduction = (state.cost - new_cost) / scale;
                let predicted_reduction = (state.cost - predicted_cost) / scale;
                let cost_settled = new_cost.is_finite()
                    && actual_reduction.abs() <= self.config.ftol
                    && predicted_reduction <= self.config.ftol;

                if new_cost.is_finite() && new_cost < state.cost {
                    let step_norm = l2_norm(&step);
                    let param_norm = l2_norm(&new_params);

                    state.params = new_params;
                    state.residuals = new_residuals;
                    state.cost = new_cost;
                    state.iterations += 1;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    log::debug!(
                        "lm iteration {}: cost = {:.6e}, lambda = {:.1e}, |g| = {:.3e}",
                        state.iterations,
                        state.cost,
                        lambda,
                        gradient_norm
                    );

                    if step_norm <= self.config.xtol * (param_norm + self.config.xtol) {
                        return self.finish(
                            problem,
                            state,
                            ConvergenceStatus::ParameterConvergence,
                        );
                    }
                    if cost_settled {
                        return self.finish(
                            problem,
                            state,
                            ConvergenceStatus::FunctionValueConvergence,
                        );
                    }
                    break;
                }

                // Rejected step: the current point is already as good as
                // the linear model can make it.
                if cost_settled {
                    let status = ConvergenceStatus::FunctionValueConvergence;
                    return self.finish(problem, state, status);
                }

                lambda *= self.config.lambda_up_factor;
                if lambda > self.config.max_lambda {
                    return self.finish(problem, state, ConvergenceStatus::DampingSaturated);
                }
            }
        }
    }

    /// Solve `(J^T J + lambda * D) dx = -J^T r` for the step `dx`.
    ///
    /// `D` is the diagonal of `J^T J` (floored to keep it positive) when
    /// `scale_diagonal` is set, the identity otherwise.
    fn calculate_step(
        &self,
        jtj: &Array2<f64>,
        jtr: &Array1<f64>,
        lambda: f64,
    ) -> Option<Array1<f64>> {
        let n = jtj.nrows();
        let mut a = jtj.clone();

        if self.config.scale_diagonal {
            let max_diag = (0..n).map(|i| jtj[[i, i]]).fold(0.0, f64::max);
            let floor = if max_diag > 0.0 {
                max_diag * 1e-12
            } else {
                1.0
            };
            for i in 0..n {
                a[[i, i]] += lambda * jtj[[i, i]].max(floor);
            }
        } else {
            for i in 0..n {
                a[[i, i]] += lambda;
            }
        }

        let rhs = jtr.mapv(|v| -v);
        let step = cholesky_solve(&a, &rhs).or_else(|| lstsq(&a, &rhs).ok())?;
        if step.iter().all(|v| v.is_finite()) {
            Some(step)
        } else {
            None
        }
    }

    fn interrupted(
        &self,
        started: Instant,
        deadline: Option<Duration>,
    ) -> Option<ConvergenceStatus> {
        if self.cancel.as_ref().map_or(false, CancelToken::is_cancelled) {
            return Some(ConvergenceStatus::Cancelled);
        }
        match deadline {
            Some(limit) if started.elapsed() >= limit => Some(ConvergenceStatus::TimeLimitReached),
            _ => None,
        }
    }

    fn finish<P: Problem>(
        &self,
        problem: &P,
        state: IterState,
        status: ConvergenceStatus,
    ) -> Result<LmResult> {
        let jacobian = if self.config.calc_jacobian && status != ConvergenceStatus::NumericalError {
            Some(problem.jacobian(&state.params)?)
        } else {
            None
        };

        let message = format!(
            "{} after {} iterations (cost = {:.6e})",
            status.description(),
            state.iterations,
            state.cost
        );
        if status.is_converged() {
            log::debug!("{}", message);
        } else {
            log::warn!("{}", message);
        }

        Ok(LmResult {
            params: state.params,
            residuals: state.residuals,
            cost: state.cost,
            iterations: state.iterations,
            func_evals: state.func_evals,
            success: status.is_converged(),
            status,
            message,
            jacobian,
        })
    }
}

fn sum_of_squares(values: &Array1<f64>) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn l2_norm(values: &Array1<f64>) -> f64 {
    sum_of_squares(values).sqrt()
}
