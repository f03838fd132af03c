//! Polynomial baseline fitting.

use approx::assert_relative_eq;
use specfit_rs::{BaselineFitter, SpecFitError};

use crate::test_helpers::{linspace, with_noise};

#[test]
fn test_constant_baseline_identity() {
    let axis = linspace(-5.0, 5.0, 101);
    let fit = BaselineFitter::new()
        .fit(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0], 0, &axis)
        .unwrap();

    assert_eq!(fit.order, 0);
    assert_eq!(fit.values.len(), axis.len());
    assert!(fit.values.iter().all(|v| (v - 5.0).abs() < 1e-12));
}

#[test]
fn test_empty_anchors_are_unfitted() {
    let fit = BaselineFitter::new().fit(&[], &[], 2, &[0.0, 1.0]).unwrap();
    assert!(fit.values.is_empty());
    assert!(!fit.is_fitted());
}

#[test]
fn test_underdetermined_order() {
    let err = BaselineFitter::new()
        .fit(&[0.0], &[5.0], 2, &[0.0, 1.0])
        .unwrap_err();
    assert!(matches!(err, SpecFitError::InsufficientPoints { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_noisy_quadratic_continuum() {
    // Continuum sampled at 60 anchors of a 1024-channel band
    let axis = linspace(1.4190e9, 1.4210e9, 1024);
    let truth = |f: f64| {
        let t = (f - 1.4200e9) / 1.0e6;
        1.2 - 0.3 * t + 0.15 * t * t
    };
    let xs: Vec<f64> = axis.iter().step_by(17).copied().collect();
    let clean: Vec<f64> = xs.iter().map(|&f| truth(f)).collect();
    let ys = with_noise(&clean, 0.01, 7);

    let fit = BaselineFitter::new().fit(&xs, &ys, 2, &axis).unwrap();
    assert_eq!(fit.coefficients.len(), 3);
    for (f, v) in axis.iter().zip(fit.values.iter()).step_by(50) {
        assert_relative_eq!(*v, truth(*f), epsilon = 0.02);
    }
    let rms = fit.rms_residual.unwrap();
    assert!(rms > 0.005 && rms < 0.015, "rms = {}", rms);
}

#[test]
fn test_baseline_is_not_clamped_outside_anchors() {
    let axis = linspace(0.0, 100.0, 101);
    let fit = BaselineFitter::new()
        .fit(&[40.0, 50.0, 60.0], &[4.0, 5.0, 6.0], 1, &axis)
        .unwrap();

    assert_relative_eq!(fit.values[0], 0.0, epsilon = 1e-9);
    assert_relative_eq!(fit.values[100], 10.0, epsilon = 1e-9);
    assert_relative_eq!(fit.evaluate(200.0).unwrap(), 20.0, epsilon = 1e-9);
}
