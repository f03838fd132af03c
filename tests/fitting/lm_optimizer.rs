//! Integration tests for the Levenberg-Marquardt optimizer.

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use specfit_rs::lm::{ConvergenceStatus, LmResult};
use specfit_rs::utils::finite_difference::{jacobian, jacobian_central};
use specfit_rs::{CancelToken, LevenbergMarquardt, LmConfig, Problem, Result, SpecFitError};

use crate::test_helpers::with_noise;

/// Straight line y = a*x + b with an analytic Jacobian.
struct LineProblem {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Problem for LineProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(SpecFitError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        Ok(self.x.mapv(|x| params[0] * x + params[1]) - &self.y)
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }

    fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
        let mut jac = Array2::ones((self.x.len(), 2));
        jac.column_mut(0).assign(&self.x);
        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// Damped oscillation y = a * exp(-x / tau) * cos(w x), finite-difference Jacobian.
struct Oscillation {
    x: Array1<f64>,
    y: Array1<f64>,
}

impl Oscillation {
    fn model(params: &Array1<f64>, x: f64) -> f64 {
        params[0] * (-x / params[1]).exp() * (params[2] * x).cos()
    }
}

impl Problem for Oscillation {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self
            .x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| Self::model(params, x) - y)
            .collect())
    }

    fn parameter_count(&self) -> usize {
        3
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }
}

fn line_problem() -> LineProblem {
    let x = Array1::linspace(0.0, 10.0, 50);
    let clean: Vec<f64> = x.iter().map(|x| 2.5 * x - 1.0).collect();
    let y = Array1::from(with_noise(&clean, 0.1, 3));
    LineProblem { x, y }
}

#[test]
fn test_linear_matches_normal_equations() {
    let problem = line_problem();
    let result: LmResult = LevenbergMarquardt::new()
        .minimize(&problem, array![0.0, 0.0])
        .unwrap();
    assert!(result.success, "{}", result.message);

    // Closed-form least squares
    let n = problem.x.len() as f64;
    let (sx, sy) = (problem.x.sum(), problem.y.sum());
    let sxx = problem.x.dot(&problem.x);
    let sxy = problem.x.dot(&problem.y);
    let slope = (n * sxy - sx * sy) / (n * sxx - sx * sx);
    let intercept = (sy - slope * sx) / n;

    assert_relative_eq!(result.params[0], slope, epsilon = 1e-8);
    assert_relative_eq!(result.params[1], intercept, epsilon = 1e-8);
    assert_relative_eq!(result.params[0], 2.5, epsilon = 0.05);
}

#[test]
fn test_finite_difference_oscillation() {
    let x = Array1::linspace(0.0, 6.0, 120);
    let truth = array![1.5, 2.0, 3.0];
    let y = x.mapv(|x| Oscillation::model(&truth, x));
    let problem = Oscillation { x, y };

    let result = LevenbergMarquardt::new()
        .minimize(&problem, array![1.0, 1.5, 2.8])
        .unwrap();
    assert!(result.status.is_converged(), "{}", result.message);
    for (p, t) in result.params.iter().zip(truth.iter()) {
        assert_relative_eq!(p, t, epsilon = 1e-6);
    }
    assert!(!problem.has_custom_jacobian());
}

#[test]
fn test_jacobians_agree() {
    let problem = line_problem();
    let params = array![1.0, 0.5];
    let analytic = problem.jacobian(&params).unwrap();
    let forward = jacobian(&problem, &params, None).unwrap();
    let central = jacobian_central(&problem, &params, None).unwrap();

    for ((a, f), c) in analytic.iter().zip(forward.iter()).zip(central.iter()) {
        assert_relative_eq!(a, f, epsilon = 1e-5);
        assert_relative_eq!(a, c, epsilon = 1e-7);
    }
}

#[test]
fn test_config_from_json_and_budget() {
    let config = LmConfig::from_json(r#"{"max_iterations": 2, "calc_jacobian": true}"#).unwrap();
    let x = Array1::linspace(0.0, 6.0, 120);
    let truth = array![1.5, 2.0, 3.0];
    let y = x.mapv(|x| Oscillation::model(&truth, x));
    let problem = Oscillation { x, y };

    let result = LevenbergMarquardt::with_config(config)
        .minimize(&problem, array![1.0, 1.0, 2.5])
        .unwrap();
    assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.jacobian.as_ref().unwrap().dim(), (120, 3));
    assert!(result.to_string().contains("Success: false"));
}

#[test]
fn test_cancel_from_another_thread() {
    let token = CancelToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();

    let result = LevenbergMarquardt::new()
        .with_cancel_token(token)
        .minimize(&line_problem(), array![0.0, 0.0])
        .unwrap();
    assert_eq!(result.status, ConvergenceStatus::Cancelled);
    assert!(!result.success);
}
