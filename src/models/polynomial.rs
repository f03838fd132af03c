//! Polynomial model in a normalized variable.
//!
//! The polynomial is stored as
//!
//! f(x) = c[0] + c[1]*t + c[2]*t^2 + ... + c[n]*t^n,  t = (x - center) / half_width
//!
//! Fitting in `t` keeps the Vandermonde matrix well conditioned even when `x`
//! is a sky frequency of order 1e9 Hz.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecFitError};
use crate::utils::linalg::lstsq;

/// A polynomial of arbitrary order over a normalized domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    /// Coefficients, lowest order first.
    coefficients: Vec<f64>,
    center: f64,
    half_width: f64,
}

impl Polynomial {
    /// Create a polynomial from coefficients in the normalized variable.
    pub fn new(coefficients: Vec<f64>, center: f64, half_width: f64) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(SpecFitError::InvalidInput(
                "a polynomial needs at least one coefficient".to_string(),
            ));
        }
        if !center.is_finite() || !half_width.is_finite() || half_width <= 0.0 {
            return Err(SpecFitError::InvalidInput(format!(
                "invalid polynomial domain: center {}, half width {}",
                center, half_width
            )));
        }
        Ok(Self {
            coefficients,
            center,
            half_width,
        })
    }

    /// Least-squares fit of an order-`order` polynomial to `(xs, ys)`.
    ///
    /// The normalization domain is the span of `xs`. When all `xs` coincide
    /// the half width falls back to 1.
    pub fn fit(xs: &[f64], ys: &[f64], order: usize) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "x has {} values, y has {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < order + 1 {
            return Err(SpecFitError::InsufficientPoints {
                required: order + 1,
                got: xs.len(),
            });
        }

        let (lo, hi) = xs
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let center = 0.5 * (lo + hi);
        let half_width = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };

        let ts: Vec<f64> = xs.iter().map(|x| (x - center) / half_width).collect();
        let a = Self::vandermonde(&ts, order);
        let b = Array1::from(ys.to_vec());
        let coefficients = lstsq(&a, &b)?;

        Self::new(coefficients.to_vec(), center, half_width)
    }

    /// Design matrix with columns `1, t, t^2, ..., t^order`.
    pub fn vandermonde(ts: &[f64], order: usize) -> Array2<f64> {
        let mut a = Array2::zeros((ts.len(), order + 1));
        for (i, &t) in ts.iter().enumerate() {
            let mut power = 1.0;
            for j in 0..=order {
                a[[i, j]] = power;
                power *= t;
            }
        }
        a
    }

    /// Polynomial order (number of coefficients minus one).
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// `(min, max)` of the x range the normalized variable maps to `[-1, 1]`.
    pub fn domain(&self) -> (f64, f64) {
        (self.center - self.half_width, self.center + self.half_width)
    }

    /// Map `x` into the normalized variable.
    pub fn normalize(&self, x: f64) -> f64 {
        (x - self.center) / self.half_width
    }

    /// Evaluate at a single point (Horner's scheme).
    pub fn eval(&self, x: f64) -> f64 {
        let t = self.normalize(x);
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// Evaluate at every point of `xs`.
    pub fn eval_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}
