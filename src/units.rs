//! Display units of the spectral axis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpecFitError;

/// Unit in which the spectral axis is displayed or selections are drawn.
///
/// Frequency in Hz is the canonical unit; every other unit is reached
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Hz,
    KHz,
    MHz,
    GHz,
    /// FITS pixel coordinate along the spectral axis (1-based).
    Channel,
    /// Radio-definition velocity in km/s.
    Velocity,
}

impl Unit {
    /// All units, in selector order.
    pub const ALL: [Unit; 6] = [
        Unit::Hz,
        Unit::KHz,
        Unit::MHz,
        Unit::GHz,
        Unit::Channel,
        Unit::Velocity,
    ];

    /// Multiplier to Hz for the frequency units, `None` otherwise.
    pub fn hz_per_unit(&self) -> Option<f64> {
        match self {
            Unit::Hz => Some(1.0),
            Unit::KHz => Some(1e3),
            Unit::MHz => Some(1e6),
            Unit::GHz => Some(1e9),
            Unit::Channel | Unit::Velocity => None,
        }
    }

    /// Whether this is one of the scaled frequency units.
    pub fn is_frequency(&self) -> bool {
        self.hz_per_unit().is_some()
    }

    /// Axis title for plots.
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Hz => "Hz",
            Unit::KHz => "kHz",
            Unit::MHz => "MHz",
            Unit::GHz => "GHz",
            Unit::Channel => "Channel",
            Unit::Velocity => "Velocity (km/s)",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Unit {
    type Err = SpecFitError;

    /// Accepts unit symbols and the viewer's selector values
    /// (`freq`, `freq-k`, `freq-m`, `freq-g`, `chan`, `vel`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hz" | "freq" | "frequency" => Ok(Unit::Hz),
            "khz" | "freq-k" => Ok(Unit::KHz),
            "mhz" | "freq-m" => Ok(Unit::MHz),
            "ghz" | "freq-g" => Ok(Unit::GHz),
            "chan" | "channel" | "channels" | "pixel" => Ok(Unit::Channel),
            "vel" | "velocity" | "km/s" | "kms" => Ok(Unit::Velocity),
            _ => Err(SpecFitError::UnknownUnit(s.to_string())),
        }
    }
}
