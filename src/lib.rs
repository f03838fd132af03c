//! # specfit-rs
//!
//! `specfit-rs` is the curve-fitting and unit-conversion engine of an
//! interactive viewer for single-dish radio spectra.
//!
//! The library provides:
//! - Conversions between channel, frequency (Hz/kHz/MHz/GHz) and radio
//!   velocity driven by FITS header metadata
//! - Polynomial baseline fitting to user-picked continuum anchors
//! - Joint multi-component Gaussian line fitting with a Levenberg-Marquardt
//!   optimizer that can be bounded in time or cancelled
//! - A [`SpectrumModel`] session that keeps selections in frequency and
//!   speaks display units at its boundary
//!
//! ## Basic Usage
//!
//! ```
//! use specfit_rs::{GaussianGuess, Header, SpectrumModel, Unit};
//!
//! let header = Header::new()
//!     .with("CRPIX1", 1.0)
//!     .with("CRVAL1", 1.4200e9)
//!     .with("CDELT1", 1.0e4)
//!     .with("RESTFREQ", 1.420_405_75e9);
//! let y: Vec<f64> = (1..=128)
//!     .map(|ch| {
//!         let z = (ch as f64 - 64.0) / 4.0;
//!         0.2 + 3.0 * (-0.5 * z * z).exp()
//!     })
//!     .collect();
//!
//! let mut model = SpectrumModel::new();
//! model.load_from_header(y, header).unwrap();
//!
//! let anchors = [(5.0, 0.2), (20.0, 0.2), (110.0, 0.2), (125.0, 0.2)];
//! model.fit_baseline(&anchors, Unit::Channel, 0).unwrap();
//!
//! let guess = GaussianGuess::new(56.0, 72.0, 0.0, 3.0);
//! let result = model.fit_gaussians(&[guess], Unit::Channel).unwrap();
//! assert_eq!(result.params.len(), 1);
//! assert!((result.params[0].mean - 64.0).abs() < 1e-3);
//!
//! let params = model.gaussian_params(Unit::MHz).unwrap();
//! assert!((params[0].mean - 1420.63).abs() < 1e-4);
//! ```

// Public modules
pub mod axis;
pub mod error;
pub mod header;
pub mod units;

// Conditional modules
#[cfg(feature = "matrix")]
pub mod utils;

#[cfg(feature = "lm")]
pub mod problem;

#[cfg(feature = "lm")]
pub mod lm;

#[cfg(feature = "lm")]
pub mod uncertainty;

#[cfg(feature = "lm")]
pub mod models;

#[cfg(feature = "lm")]
pub mod baseline;

#[cfg(feature = "lm")]
pub mod gaussian;

#[cfg(feature = "lm")]
pub mod spectrum;

// Re-exports for convenience
pub use axis::{
    channel_to_frequency, convert_display, frequency_to_velocity, velocity_to_frequency,
    AxisConverter, DopplerFrame, LinearWcs, SPEED_OF_LIGHT_KM_S,
};
pub use error::{Result, SpecFitError};
pub use header::{Header, HeaderValue};
pub use units::Unit;

#[cfg(feature = "lm")]
pub use baseline::{BaselineFit, BaselineFitter};

#[cfg(feature = "lm")]
pub use gaussian::{
    GaussianFitConfig, GaussianFitResult, GaussianFitter, GaussianGuess, GaussianParams,
};

#[cfg(feature = "lm")]
pub use lm::{CancelToken, LevenbergMarquardt, LmConfig};

#[cfg(feature = "lm")]
pub use problem::Problem;

#[cfg(feature = "lm")]
pub use spectrum::{FitState, Spectrum, SpectrumModel};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
