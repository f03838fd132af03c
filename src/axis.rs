//! Spectral axis conversions between channel, frequency and velocity.
//!
//! Frequency in Hz is the pivot: every conversion goes `unit -> Hz -> unit`.
//! Two pieces of header metadata drive the non-trivial legs:
//!
//! - [`LinearWcs`]: the linear world coordinate system of the spectral axis,
//!   `freq = CRVAL + (channel - CRPIX) * CDELT`, with `channel` a 1-based
//!   FITS pixel coordinate.
//! - [`DopplerFrame`]: the rest frequency and optional LSR velocity used by
//!   the radio Doppler definition `v = c * (f0 - f) / f0 - v_lsr`.
//!
//! Everything here is a pure function of its inputs and safe to call from
//! any number of threads.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecFitError};
use crate::header::Header;
use crate::units::Unit;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Header keywords that may carry the rest frequency, in lookup order.
const REST_FREQUENCY_KEYS: [&str; 2] = ["RESTFREQ", "RESTFRQ"];

/// Header keyword carrying the LSR velocity correction in km/s.
const VLSR_KEY: &str = "VELO-LSR";

/// Linear WCS of the spectral axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearWcs {
    /// Reference pixel (1-based).
    pub crpix: f64,
    /// Frequency at the reference pixel, Hz.
    pub crval: f64,
    /// Frequency increment per channel, Hz.
    pub cdelt: f64,
}

impl LinearWcs {
    /// Create a WCS, rejecting non-finite values and a zero increment.
    pub fn new(crpix: f64, crval: f64, cdelt: f64) -> Result<Self> {
        if !(crpix.is_finite() && crval.is_finite() && cdelt.is_finite()) {
            return Err(SpecFitError::InvalidHeader(format!(
                "non-finite WCS: CRPIX={}, CRVAL={}, CDELT={}",
                crpix, crval, cdelt
            )));
        }
        if cdelt == 0.0 {
            return Err(SpecFitError::InvalidHeader(
                "CDELT is zero, channel axis is degenerate".to_string(),
            ));
        }
        Ok(Self {
            crpix,
            crval,
            cdelt,
        })
    }

    /// Read `CRPIXn`, `CRVALn` and `CDELTn` (or their bare forms) from a header.
    pub fn from_header(header: &Header, axis: usize) -> Result<Self> {
        let crpix = header.axis_float("CRPIX", axis)?;
        let crval = header.axis_float("CRVAL", axis)?;
        let cdelt = header.axis_float("CDELT", axis)?;
        Self::new(crpix, crval, cdelt)
    }

    pub fn channel_to_frequency(&self, channel: f64) -> f64 {
        self.crval + (channel - self.crpix) * self.cdelt
    }

    pub fn frequency_to_channel(&self, frequency: f64) -> f64 {
        self.crpix + (frequency - self.crval) / self.cdelt
    }

    /// Frequencies of pixels `1..=n`.
    pub fn frequency_axis(&self, n: usize) -> Vec<f64> {
        (1..=n)
            .map(|pixel| self.channel_to_frequency(pixel as f64))
            .collect()
    }
}

/// Rest frame used for velocity conversions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DopplerFrame {
    /// Rest frequency of the observed line, Hz.
    pub rest_frequency: f64,
    /// LSR velocity subtracted from radio velocities, km/s.
    pub vlsr: f64,
}

impl DopplerFrame {
    /// Create a frame; the rest frequency must be positive and finite.
    pub fn new(rest_frequency: f64, vlsr: f64) -> Result<Self> {
        if !(rest_frequency.is_finite() && rest_frequency > 0.0) {
            return Err(SpecFitError::InvalidHeader(format!(
                "rest frequency must be positive, got {}",
                rest_frequency
            )));
        }
        if !vlsr.is_finite() {
            return Err(SpecFitError::InvalidHeader(format!(
                "{} is not finite: {}",
                VLSR_KEY, vlsr
            )));
        }
        Ok(Self {
            rest_frequency,
            vlsr,
        })
    }

    /// Read the rest frequency (`RESTFREQ`, then `RESTFRQ`) and the optional
    /// `VELO-LSR` correction from a header.
    pub fn from_header(header: &Header) -> Result<Self> {
        let key = REST_FREQUENCY_KEYS
            .iter()
            .find(|key| header.contains(key))
            .ok_or_else(|| {
                SpecFitError::InvalidHeader(
                    "missing rest frequency (RESTFREQ or RESTFRQ)".to_string(),
                )
            })?;
        let rest_frequency = header.require_float(key)?;
        let vlsr = if header.contains(VLSR_KEY) {
            header.require_float(VLSR_KEY)?
        } else {
            0.0
        };
        Self::new(rest_frequency, vlsr)
    }

    /// Radio velocity in km/s relative to the LSR correction.
    pub fn frequency_to_velocity(&self, frequency: f64) -> f64 {
        SPEED_OF_LIGHT_KM_S * (self.rest_frequency - frequency) / self.rest_frequency - self.vlsr
    }

    pub fn velocity_to_frequency(&self, velocity: f64) -> f64 {
        self.rest_frequency * (1.0 - (velocity + self.vlsr) / SPEED_OF_LIGHT_KM_S)
    }
}

/// Frequency of a channel under the header's linear WCS (axis 1).
pub fn channel_to_frequency(channel: f64, header: &Header) -> Result<f64> {
    Ok(LinearWcs::from_header(header, 1)?.channel_to_frequency(channel))
}

/// Radio-definition velocity in km/s, without LSR correction.
pub fn frequency_to_velocity(frequency: f64, rest_frequency: f64) -> Result<f64> {
    Ok(DopplerFrame::new(rest_frequency, 0.0)?.frequency_to_velocity(frequency))
}

/// Inverse of [`frequency_to_velocity`].
pub fn velocity_to_frequency(velocity: f64, rest_frequency: f64) -> Result<f64> {
    Ok(DopplerFrame::new(rest_frequency, 0.0)?.velocity_to_frequency(velocity))
}

/// Convert a value between display units using the header's metadata.
pub fn convert_display(value: f64, from: Unit, to: Unit, header: &Header) -> Result<f64> {
    AxisConverter::from_header(header).convert(value, from, to)
}

/// Unit converter bound to the metadata of one spectrum.
///
/// Missing metadata is only reported when a conversion actually needs it,
/// so a header without a rest frequency still converts between channels
/// and frequencies.
#[derive(Debug, Clone)]
pub struct AxisConverter {
    wcs: std::result::Result<LinearWcs, String>,
    doppler: std::result::Result<DopplerFrame, String>,
}

impl AxisConverter {
    /// Create a converter from explicit metadata.
    pub fn new(wcs: Option<LinearWcs>, doppler: Option<DopplerFrame>) -> Self {
        Self {
            wcs: wcs.ok_or_else(|| "no channel WCS available".to_string()),
            doppler: doppler.ok_or_else(|| "no rest frequency available".to_string()),
        }
    }

    /// Build a converter for spectral axis 1 of a header.
    pub fn from_header(header: &Header) -> Self {
        Self::for_axis(header, 1)
    }

    /// Build a converter for the given (1-based) axis of a header.
    pub fn for_axis(header: &Header, axis: usize) -> Self {
        let wcs = LinearWcs::from_header(header, axis).map_err(header_message);
        let doppler = DopplerFrame::from_header(header).map_err(header_message);
        if let Err(msg) = &wcs {
            log::debug!("channel conversion unavailable on axis {}: {}", axis, msg);
        }
        if let Err(msg) = &doppler {
            log::debug!("velocity conversion unavailable: {}", msg);
        }
        Self { wcs, doppler }
    }

    pub fn wcs(&self) -> Result<&LinearWcs> {
        self.wcs
            .as_ref()
            .map_err(|msg| SpecFitError::InvalidHeader(msg.clone()))
    }

    pub fn doppler(&self) -> Result<&DopplerFrame> {
        self.doppler
            .as_ref()
            .map_err(|msg| SpecFitError::InvalidHeader(msg.clone()))
    }

    /// Convert a value in `unit` to frequency in Hz.
    pub fn to_frequency(&self, value: f64, unit: Unit) -> Result<f64> {
        match unit {
            Unit::Channel => Ok(self.wcs()?.channel_to_frequency(value)),
            Unit::Velocity => Ok(self.doppler()?.velocity_to_frequency(value)),
            scaled => Ok(value * scale(scaled)),
        }
    }

    /// Convert a frequency in Hz to `unit`.
    pub fn from_frequency(&self, frequency: f64, unit: Unit) -> Result<f64> {
        match unit {
            Unit::Channel => Ok(self.wcs()?.frequency_to_channel(frequency)),
            Unit::Velocity => Ok(self.doppler()?.frequency_to_velocity(frequency)),
            scaled => Ok(frequency / scale(scaled)),
        }
    }

    /// Convert a value between any two units through frequency.
    pub fn convert(&self, value: f64, from: Unit, to: Unit) -> Result<f64> {
        if from == to {
            match from {
                Unit::Channel => self.wcs().map(|_| value),
                Unit::Velocity => self.doppler().map(|_| value),
                _ => Ok(value),
            }
        } else if let (Some(a), Some(b)) = (from.hz_per_unit(), to.hz_per_unit()) {
            Ok(value * a / b)
        } else {
            self.from_frequency(self.to_frequency(value, from)?, to)
        }
    }

    /// Convert a whole array in parallel.
    pub fn convert_all(&self, values: &[f64], from: Unit, to: Unit) -> Result<Vec<f64>> {
        values
            .par_iter()
            .map(|&v| self.convert(v, from, to))
            .collect()
    }

    /// `|d(unit)/d(Hz)|`. All supported relations are linear in frequency,
    /// so the factor is constant along the axis.
    pub fn units_per_hz(&self, unit: Unit) -> Result<f64> {
        match unit {
            Unit::Channel => Ok(1.0 / self.wcs()?.cdelt.abs()),
            Unit::Velocity => Ok(SPEED_OF_LIGHT_KM_S / self.doppler()?.rest_frequency),
            scaled => Ok(1.0 / scale(scaled)),
        }
    }

    /// Convert a width (e.g. a Gaussian sigma) in Hz to `unit`.
    pub fn width_from_frequency(&self, width: f64, unit: Unit) -> Result<f64> {
        Ok(width * self.units_per_hz(unit)?)
    }

    /// Convert a width in `unit` to Hz.
    pub fn width_to_frequency(&self, width: f64, unit: Unit) -> Result<f64> {
        Ok(width / self.units_per_hz(unit)?)
    }
}

fn header_message(err: SpecFitError) -> String {
    match err {
        SpecFitError::InvalidHeader(msg) => msg,
        other => other.to_string(),
    }
}

fn scale(unit: Unit) -> f64 {
    unit.hz_per_unit().unwrap_or(1.0)
}
