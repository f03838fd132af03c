//! Conversion round trips through the frequency pivot.

use approx::assert_relative_eq;
use specfit_rs::{
    channel_to_frequency, convert_display, frequency_to_velocity, AxisConverter, Header,
    SpecFitError, Unit, SPEED_OF_LIGHT_KM_S,
};

use crate::test_helpers::{hi_header, HI_REST};

#[test]
fn test_round_trip_every_unit_pair() {
    let header = hi_header();
    let frequencies = [HI_REST - 1.2e6, HI_REST - 3.0e3, HI_REST, HI_REST + 7.5e5];

    for &f in &frequencies {
        for &from in &Unit::ALL {
            let v = convert_display(f, Unit::Hz, from, &header).unwrap();
            for &to in &Unit::ALL {
                let there = convert_display(v, from, to, &header).unwrap();
                let back = convert_display(there, to, from, &header).unwrap();
                assert_relative_eq!(back, v, epsilon = 1e-9, max_relative = 1e-9);
            }
        }
    }
}

#[test]
fn test_channel_formula_is_one_based() {
    let header = hi_header();
    // Reference pixel maps to the reference value
    assert_relative_eq!(channel_to_frequency(256.0, &header).unwrap(), HI_REST);
    assert_relative_eq!(
        channel_to_frequency(1.0, &header).unwrap(),
        HI_REST + 255.0 * 5.0e3,
        max_relative = 1e-14
    );
}

#[test]
fn test_velocity_uses_radio_definition_and_lsr() {
    let header = hi_header();
    let f = HI_REST - 1.0e5;
    let v = convert_display(f, Unit::Hz, Unit::Velocity, &header).unwrap();
    let radio = SPEED_OF_LIGHT_KM_S * 1.0e5 / HI_REST;
    assert_relative_eq!(v, radio - 12.5, max_relative = 1e-10);

    // Free function has no LSR term
    assert_relative_eq!(
        frequency_to_velocity(f, HI_REST).unwrap(),
        radio,
        max_relative = 1e-10
    );
}

#[test]
fn test_scaled_units_need_no_metadata() {
    let header = Header::new();
    assert_relative_eq!(
        convert_display(1420.0, Unit::MHz, Unit::GHz, &header).unwrap(),
        1.42
    );
    assert_relative_eq!(
        convert_display(2.5, Unit::KHz, Unit::Hz, &header).unwrap(),
        2500.0
    );
}

#[test]
fn test_missing_metadata_is_reported() {
    let no_rest = Header::new()
        .with("CRPIX1", 1.0)
        .with("CRVAL1", 1.0e9)
        .with("CDELT1", 1.0e3);
    assert!(matches!(
        convert_display(1.0e9, Unit::Hz, Unit::Velocity, &no_rest),
        Err(SpecFitError::InvalidHeader(_))
    ));
    assert!(convert_display(10.0, Unit::Channel, Unit::MHz, &no_rest).is_ok());

    let zero_step = no_rest.clone().with("CDELT1", 0.0);
    assert!(matches!(
        channel_to_frequency(1.0, &zero_step),
        Err(SpecFitError::InvalidHeader(_))
    ));

    assert!(matches!(
        frequency_to_velocity(1.0e9, 0.0),
        Err(SpecFitError::InvalidHeader(_))
    ));
}

#[test]
fn test_convert_all_matches_scalar_conversion() {
    let converter = AxisConverter::from_header(&hi_header());
    let channels: Vec<f64> = (1..=512).map(|c| c as f64).collect();
    let velocities = converter
        .convert_all(&channels, Unit::Channel, Unit::Velocity)
        .unwrap();

    assert_eq!(velocities.len(), 512);
    for (c, v) in channels.iter().zip(velocities.iter()).step_by(37) {
        let expected = converter.convert(*c, Unit::Channel, Unit::Velocity).unwrap();
        assert_relative_eq!(*v, expected);
    }
    // Descending frequency axis means ascending radio velocity
    assert!(velocities.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_concurrent_conversions_agree() {
    let header = hi_header();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let header = header.clone();
            std::thread::spawn(move || {
                convert_display(100.0 + i as f64, Unit::Channel, Unit::Velocity, &header).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let v = handle.join().unwrap();
        let expected =
            convert_display(100.0 + i as f64, Unit::Channel, Unit::Velocity, &header).unwrap();
        assert_eq!(v, expected);
    }
}
