//! Polynomial baseline fitting.
//!
//! The baseline is fitted to a sparse set of anchor points picked on the
//! continuum and evaluated over the whole spectral axis, so it can be
//! subtracted before the line fit.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::axis::AxisConverter;
use crate::error::{Result, SpecFitError};
use crate::models::Polynomial;
use crate::units::Unit;

/// Result of a baseline fit.
///
/// An unfitted result has no domain and empty `values`; check
/// [`BaselineFit::is_fitted`] rather than the length of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineFit {
    /// Requested polynomial order.
    pub order: usize,

    /// Baseline evaluated at every point of the spectral axis.
    pub values: Vec<f64>,

    /// Coefficients, lowest order first, in the normalized variable
    /// `t = (x - center) / half_width` of [`BaselineFit::domain`].
    pub coefficients: Vec<f64>,

    /// `(min, max)` of the anchor x range mapped to `t = -1..1`.
    pub domain: Option<(f64, f64)>,

    /// RMS of the fit residuals at the anchors.
    pub rms_residual: Option<f64>,
}

impl BaselineFit {
    /// The "no fit" result for the given order.
    pub fn unfitted(order: usize) -> Self {
        Self {
            order,
            values: Vec::new(),
            coefficients: Vec::new(),
            domain: None,
            rms_residual: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.domain.is_some()
    }

    /// Fitted polynomial, `None` when unfitted.
    pub fn polynomial(&self) -> Option<Polynomial> {
        let (lo, hi) = self.domain?;
        let half_width = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };
        Polynomial::new(self.coefficients.clone(), 0.5 * (lo + hi), half_width).ok()
    }

    /// Evaluate the baseline at an arbitrary x in the unit the fit is
    /// expressed in (Hz unless converted with [`BaselineFit::to_unit`]).
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        self.polynomial().map(|p| p.eval(x))
    }

    /// Re-express a fit made in Hz over the axis of `unit`.
    ///
    /// Every display unit is affine in frequency, so only the domain moves.
    /// When `unit` runs against frequency the normalized variable changes
    /// sign and the odd coefficients flip with it. `values` are data values
    /// and stay as they are.
    pub fn to_unit(&self, converter: &AxisConverter, unit: Unit) -> Result<Self> {
        let (lo, hi) = match self.domain {
            Some(domain) => domain,
            None => return Ok(self.clone()),
        };
        let a = converter.from_frequency(lo, unit)?;
        let b = converter.from_frequency(hi, unit)?;
        let reversed = b < a;
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .map(|(k, &c)| if reversed && k % 2 == 1 { -c } else { c })
            .collect();

        Ok(Self {
            order: self.order,
            values: self.values.clone(),
            coefficients,
            domain: Some((a.min(b), a.max(b))),
            rms_residual: self.rms_residual,
        })
    }
}

/// Stateless least-squares polynomial baseline fitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFitter;

impl BaselineFitter {
    pub fn new() -> Self {
        Self
    }

    /// Fit an order-`order` polynomial to the anchors `(xs, ys)` and evaluate
    /// it at every point of `axis`.
    ///
    /// Empty anchors give the unfitted result. Fewer than `order + 1`
    /// distinct anchor abscissae fail with `InsufficientPoints`. The fit is
    /// not clamped outside the anchor range.
    pub fn fit(&self, xs: &[f64], ys: &[f64], order: usize, axis: &[f64]) -> Result<BaselineFit> {
        if xs.len() != ys.len() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "{} anchor x values but {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.is_empty() {
            return Ok(BaselineFit::unfitted(order));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(SpecFitError::InvalidInput(
                "baseline anchors must be finite".to_string(),
            ));
        }

        let distinct = distinct_count(xs);
        if distinct < order + 1 {
            log::warn!(
                "baseline order {} needs {} distinct anchors, got {}",
                order,
                order + 1,
                distinct
            );
            return Err(SpecFitError::InsufficientPoints {
                required: order + 1,
                got: distinct,
            });
        }

        let poly = Polynomial::fit(xs, ys, order)?;
        let values: Vec<f64> = axis.par_iter().map(|&x| poly.eval(x)).collect();

        let sum_sq: f64 = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| (poly.eval(x) - y).powi(2))
            .sum();
        let rms = (sum_sq / xs.len() as f64).sqrt();

        log::info!(
            "fitted order {} baseline to {} anchors (rms {:.3e})",
            order,
            xs.len(),
            rms
        );

        Ok(BaselineFit {
            order,
            values,
            coefficients: poly.coefficients().to_vec(),
            domain: Some(poly.domain()),
            rms_residual: Some(rms),
        })
    }
}

fn distinct_count(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
