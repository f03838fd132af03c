//! Joint Gaussian fitting.

use approx::assert_relative_eq;
use specfit_rs::{
    GaussianFitConfig, GaussianFitter, GaussianGuess, LmConfig, SpecFitError,
};

use crate::test_helpers::{gauss, linspace, rms_diff, with_noise};

#[test]
fn test_single_peak_scenario() {
    let x = linspace(-10.0, 10.0, 401);
    let y: Vec<f64> = x.iter().map(|&v| gauss(v, 0.0, 1.5, 3.0)).collect();
    let guesses = [GaussianGuess::new(-3.0, 3.0, -1.0, 3.0)];

    let result = GaussianFitter::new().fit(&x, &y, &guesses).unwrap();

    let p = result.params[0];
    assert_relative_eq!(p.mean, 0.0, epsilon = 0.1);
    assert_relative_eq!(p.sigma, 1.5, epsilon = 0.1);
    assert_relative_eq!(p.amplitude, 3.0, epsilon = 0.1);

    let y_rms = (y.iter().map(|v| v * v).sum::<f64>() / y.len() as f64).sqrt();
    assert!(rms_diff(&result.stack, &y) < 0.01 * y_rms);
}

#[test]
fn test_empty_guesses_give_zero_stack() {
    let x = linspace(-10.0, 10.0, 401);
    let y: Vec<f64> = x.iter().map(|&v| gauss(v, 0.0, 1.5, 3.0)).collect();

    let result = GaussianFitter::new().fit(&x, &y, &[]).unwrap();
    assert!(result.stack.iter().all(|&v| v == 0.0));
    assert_eq!(result.stack.len(), 401);
    assert!(result.components.is_empty());
    assert!(result.params.is_empty());
}

#[test]
fn test_component_order_follows_guesses() {
    let x = linspace(0.0, 200.0, 801);
    let truth = [(30.0, 4.0, 1.0), (100.0, 6.0, -0.8), (160.0, 3.0, 2.5)];
    let y: Vec<f64> = x
        .iter()
        .map(|&v| truth.iter().map(|&(m, s, a)| gauss(v, m, s, a)).sum())
        .collect();

    // Drawn in an arbitrary order
    let guesses = [
        GaussianGuess::new(150.0, 170.0, 0.0, 2.0),
        GaussianGuess::new(15.0, 45.0, 0.0, 1.2),
        GaussianGuess::new(85.0, 115.0, -1.0, -0.5),
    ];
    let result = GaussianFitter::new().fit(&x, &y, &guesses).unwrap();

    assert_eq!(result.params.len(), guesses.len());
    assert_eq!(result.components.len(), guesses.len());
    for (guess, p) in guesses.iter().zip(result.params.iter()) {
        assert!(
            guess.xmin <= p.mean && p.mean <= guess.xmax,
            "mean {} outside [{}, {}]",
            p.mean,
            guess.xmin,
            guess.xmax
        );
    }
    assert_relative_eq!(result.params[2].amplitude, -0.8, epsilon = 1e-4);

    // Each curve is evaluated with the fitted parameters
    for (curve, p) in result.components.iter().zip(result.params.iter()) {
        let peak = curve.iter().fold(0.0_f64, |m, v| if v.abs() > m.abs() { *v } else { m });
        assert_relative_eq!(peak, p.amplitude, max_relative = 1e-3);
    }
}

#[test]
fn test_blended_lines_fit_jointly() {
    let x = linspace(-8.0, 8.0, 321);
    let y: Vec<f64> = x
        .iter()
        .map(|&v| gauss(v, -1.2, 1.0, 2.0) + gauss(v, 1.3, 0.9, 1.0))
        .collect();
    let guesses = [
        GaussianGuess::new(-3.0, 0.0, 0.0, 2.0),
        GaussianGuess::new(0.0, 3.0, 0.0, 1.0),
    ];

    let result = GaussianFitter::new().fit(&x, &y, &guesses).unwrap();
    let (a, b) = (result.params[0], result.params[1]);
    assert_relative_eq!(a.mean, -1.2, epsilon = 1e-4);
    assert_relative_eq!(a.sigma, 1.0, epsilon = 1e-4);
    assert_relative_eq!(a.amplitude, 2.0, epsilon = 1e-4);
    assert_relative_eq!(b.mean, 1.3, epsilon = 1e-4);
    assert_relative_eq!(b.sigma, 0.9, epsilon = 1e-4);
    assert_relative_eq!(b.amplitude, 1.0, epsilon = 1e-4);
}

#[test]
fn test_noisy_peak_with_errors() {
    let x = linspace(-10.0, 10.0, 401);
    let clean: Vec<f64> = x.iter().map(|&v| gauss(v, 0.4, 1.5, 3.0)).collect();
    let y = with_noise(&clean, 0.05, 42);
    let guesses = [GaussianGuess::new(-3.0, 3.0, -1.0, 3.0)];

    let result = GaussianFitter::new().fit(&x, &y, &guesses).unwrap();
    let p = result.params[0];
    assert_relative_eq!(p.mean, 0.4, epsilon = 0.05);
    assert_relative_eq!(p.sigma, 1.5, epsilon = 0.05);
    assert_relative_eq!(p.amplitude, 3.0, epsilon = 0.1);
    assert!(result.iterations > 0);
    assert!(result.rms_residual > 0.03 && result.rms_residual < 0.07);

    let errors = result.errors.expect("covariance available");
    assert!(errors[0].mean > 0.0 && errors[0].mean < 0.05);
    assert!(errors[0].amplitude > 0.0 && errors[0].amplitude < 0.1);
}

#[test]
fn test_hz_scale_axis() {
    let x = linspace(1.4195e9, 1.4215e9, 400);
    let y: Vec<f64> = x.iter().map(|&f| gauss(f, 1.42041e9, 2.5e4, 0.7)).collect();
    let guesses = [GaussianGuess::new(1.42035e9, 1.42047e9, 0.0, 0.6)];

    let result = GaussianFitter::new().fit(&x, &y, &guesses).unwrap();
    let p = result.params[0];
    assert_relative_eq!(p.mean, 1.42041e9, epsilon = 1.0);
    assert_relative_eq!(p.sigma, 2.5e4, max_relative = 1e-5);
    assert_relative_eq!(p.amplitude, 0.7, max_relative = 1e-5);
    assert_relative_eq!(p.fwhm(), 2.5e4 * 2.354_820_045, max_relative = 1e-5);
}

#[test]
fn test_iteration_budget_exhausted() {
    let x = linspace(-10.0, 10.0, 201);
    let y: Vec<f64> = x.iter().map(|&v| gauss(v, 1.0, 1.0, 2.0)).collect();
    let config = GaussianFitConfig {
        lm: LmConfig {
            max_iterations: 0,
            ..LmConfig::default()
        },
        ..GaussianFitConfig::default()
    };

    let err = GaussianFitter::with_config(config)
        .fit(&x, &y, &[GaussianGuess::new(-4.0, 4.0, 0.0, 1.0)])
        .unwrap_err();
    assert!(matches!(err, SpecFitError::FitDidNotConverge(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_time_budget_exhausted() {
    let x = linspace(-10.0, 10.0, 201);
    let y: Vec<f64> = x.iter().map(|&v| gauss(v, 1.0, 1.0, 2.0)).collect();
    let config = GaussianFitConfig {
        lm: LmConfig {
            max_duration_ms: Some(0),
            ..LmConfig::default()
        },
        ..GaussianFitConfig::default()
    };

    let err = GaussianFitter::with_config(config)
        .fit(&x, &y, &[GaussianGuess::new(-4.0, 4.0, 0.0, 1.0)])
        .unwrap_err();
    assert!(matches!(err, SpecFitError::FitDidNotConverge(_)));
}
