//! Display unit parsing and width conversion.

use approx::assert_relative_eq;
use specfit_rs::{
    AxisConverter, DopplerFrame, LinearWcs, SpecFitError, Unit, SPEED_OF_LIGHT_KM_S,
};

#[test]
fn test_selector_values_parse() {
    let parsed: Vec<Unit> = ["freq", "freq-k", "freq-m", "freq-g", "chan", "vel"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(parsed, Unit::ALL.to_vec());
    assert!(matches!(
        "lightyear".parse::<Unit>(),
        Err(SpecFitError::UnknownUnit(_))
    ));
}

#[test]
fn test_width_conversion() {
    let wcs = LinearWcs::new(1.0, 1.0e9, -2.0e3).unwrap();
    let frame = DopplerFrame::new(1.0e9, 0.0).unwrap();
    let converter = AxisConverter::new(Some(wcs), Some(frame));

    // A 10 kHz sigma spans 5 channels regardless of the axis direction
    assert_relative_eq!(
        converter.width_from_frequency(1.0e4, Unit::Channel).unwrap(),
        5.0,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        converter.width_from_frequency(1.0e4, Unit::Velocity).unwrap(),
        SPEED_OF_LIGHT_KM_S * 1.0e-5,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        converter.width_to_frequency(10.0, Unit::KHz).unwrap(),
        1.0e4,
        max_relative = 1e-12
    );
}

#[test]
fn test_converter_without_metadata() {
    let converter = AxisConverter::new(None, None);
    assert!(converter.convert(1.0, Unit::GHz, Unit::MHz).is_ok());
    assert!(matches!(
        converter.convert(1.0, Unit::Channel, Unit::Hz),
        Err(SpecFitError::InvalidHeader(_))
    ));
    assert!(matches!(
        converter.units_per_hz(Unit::Velocity),
        Err(SpecFitError::InvalidHeader(_))
    ));
}
