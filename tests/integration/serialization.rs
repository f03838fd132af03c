//! JSON at the host boundary.

use specfit_rs::{
    FitState, GaussianFitConfig, GaussianFitResult, GaussianFitter, GaussianGuess, Header,
    SpectrumModel, Unit,
};

use crate::test_helpers::{gauss, linspace};

#[test]
fn test_header_from_host_json() {
    let json = r#"{
        "SIMPLE": true,
        "NAXIS1": 4,
        "CRPIX1": 1,
        "CRVAL1": 1.0e9,
        "CDELT1": 2.5e5,
        "RESTFRQ": 1.0e9,
        "OBJECT": "test"
    }"#;
    let header = Header::from_json(json).unwrap();

    let mut model = SpectrumModel::new();
    model
        .load_from_header(vec![0.0, 1.0, 0.0, -1.0], header)
        .unwrap();
    assert_eq!(
        model.axis_values(Unit::MHz).unwrap(),
        vec![1000.0, 1000.25, 1000.5, 1000.75]
    );
    assert!(model.axis_values(Unit::Velocity).is_ok());
}

#[test]
fn test_fit_result_round_trip() {
    let x = linspace(-5.0, 5.0, 101);
    let y: Vec<f64> = x.iter().map(|&v| gauss(v, 0.5, 1.0, 2.0)).collect();
    let result = GaussianFitter::new()
        .fit(&x, &y, &[GaussianGuess::new(-1.0, 2.0, 0.0, 2.0)])
        .unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let back: GaussianFitResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.params.len(), 1);
    assert_eq!(back.stack.len(), result.stack.len());
    assert!((back.params[0].mean - result.params[0].mean).abs() < 1e-12);
}

#[test]
fn test_state_and_config_json() {
    assert_eq!(
        serde_json::to_string(&FitState::GaussianFitted).unwrap(),
        "\"GaussianFitted\""
    );

    let config = GaussianFitConfig::from_json(
        r#"{"max_components": 3, "lm": {"max_duration_ms": 500, "ftol": 1e-8}}"#,
    )
    .unwrap();
    assert_eq!(config.max_components, Some(3));
    assert_eq!(config.lm.max_duration_ms, Some(500));
    assert_eq!(config.lm.ftol, 1e-8);
    assert_eq!(config.sigma_divisor, 4.0);

    let guess: GaussianGuess =
        serde_json::from_str(r#"{"xmin": 1.0, "xmax": 2.0, "ymin": 0.0, "ymax": 3.0}"#).unwrap();
    assert_eq!(guess, GaussianGuess::new(1.0, 2.0, 0.0, 3.0));
}
