//! Multi-component Gaussian line fitting.
//!
//! All components are optimized jointly with Levenberg-Marquardt. Internally
//! the abscissa is mapped to `[-1, 1]` and the data scaled by its largest
//! magnitude, so the same tolerances work whether `x` is in channels or in
//! Hz around 1e9.

use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::axis::AxisConverter;
use crate::error::{Result, SpecFitError};
use crate::lm::{CancelToken, LevenbergMarquardt, LmConfig};
use crate::models::{gaussian, GaussianSumProblem, FWHM_PER_SIGMA};
use crate::uncertainty::standard_errors;
use crate::units::Unit;

/// Initial range guess for one component: a box drawn around a line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianGuess {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl GaussianGuess {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Copy with both bound pairs in ascending order.
    pub fn normalized(&self) -> Self {
        Self {
            xmin: self.xmin.min(self.xmax),
            xmax: self.xmin.max(self.xmax),
            ymin: self.ymin.min(self.ymax),
            ymax: self.ymin.max(self.ymax),
        }
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.xmin + self.xmax)
    }

    pub fn width(&self) -> f64 {
        (self.xmax - self.xmin).abs()
    }

    /// Whether `x` lies inside the x range (inclusive).
    pub fn contains(&self, x: f64) -> bool {
        let g = self.normalized();
        g.xmin <= x && x <= g.xmax
    }

    fn is_finite(&self) -> bool {
        [self.xmin, self.xmax, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<(f64, f64, f64, f64)> for GaussianGuess {
    fn from((xmin, xmax, ymin, ymax): (f64, f64, f64, f64)) -> Self {
        Self::new(xmin, xmax, ymin, ymax)
    }
}

/// Parameters of one fitted component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianParams {
    pub mean: f64,
    pub sigma: f64,
    /// Signed: negative for absorption lines.
    pub amplitude: f64,
}

impl GaussianParams {
    pub fn new(mean: f64, sigma: f64, amplitude: f64) -> Self {
        Self {
            mean,
            sigma,
            amplitude,
        }
    }

    /// Full width at half maximum.
    pub fn fwhm(&self) -> f64 {
        FWHM_PER_SIGMA * self.sigma
    }

    /// Integrated area, `amplitude * sigma * sqrt(2 pi)`.
    pub fn area(&self) -> f64 {
        self.amplitude * self.sigma * (2.0 * std::f64::consts::PI).sqrt()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        gaussian(x, self.mean, self.sigma, self.amplitude)
    }

    /// Parameters fitted in Hz expressed in `unit`: the mean as a position,
    /// sigma as a (positive) width.
    pub fn to_unit(&self, converter: &AxisConverter, unit: Unit) -> Result<Self> {
        Ok(Self::new(
            converter.from_frequency(self.mean, unit)?,
            converter.width_from_frequency(self.sigma, unit)?,
            self.amplitude,
        ))
    }
}

/// Result of a Gaussian fit, one entry per fitted component in guess order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianFitResult {
    /// Sum of all components at every point of the axis.
    pub stack: Vec<f64>,

    /// One curve per component, evaluated with the fitted parameters.
    pub components: Vec<Vec<f64>>,

    pub params: Vec<GaussianParams>,

    /// Standard errors per component, `None` when the covariance could not
    /// be estimated (no degrees of freedom or a degenerate Jacobian).
    pub errors: Option<Vec<GaussianParams>>,

    /// Optimizer iterations.
    pub iterations: usize,

    /// RMS of `stack - y`.
    pub rms_residual: f64,
}

impl GaussianFitResult {
    /// The result of fitting no components over `n` points.
    pub fn empty(n: usize, y: &[f64]) -> Self {
        let sum_sq: f64 = y.iter().map(|v| v * v).sum();
        Self {
            stack: vec![0.0; n],
            components: Vec::new(),
            params: Vec::new(),
            errors: None,
            iterations: 0,
            rms_residual: if n > 0 {
                (sum_sq / n as f64).sqrt()
            } else {
                0.0
            },
        }
    }

    /// Number of fitted components.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// A result fitted in Hz with `params` and `errors` expressed in `unit`.
    /// Standard errors of the mean and sigma are both widths. Curves are
    /// data values and are left alone.
    pub fn to_unit(&self, converter: &AxisConverter, unit: Unit) -> Result<Self> {
        let params = self
            .params
            .iter()
            .map(|p| p.to_unit(converter, unit))
            .collect::<Result<Vec<_>>>()?;
        let errors = match &self.errors {
            Some(errors) => Some(
                errors
                    .iter()
                    .map(|e| {
                        Ok(GaussianParams::new(
                            converter.width_from_frequency(e.mean, unit)?,
                            converter.width_from_frequency(e.sigma, unit)?,
                            e.amplitude,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        Ok(Self {
            stack: self.stack.clone(),
            components: self.components.clone(),
            params,
            errors,
            iterations: self.iterations,
            rms_residual: self.rms_residual,
        })
    }
}

/// Configuration of the Gaussian fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussianFitConfig {
    /// Optimizer settings.
    pub lm: LmConfig,

    /// Initial sigma is the guess width divided by this. Default: 4.0
    pub sigma_divisor: f64,

    /// Fit only the first `n` guesses. Default: None (all)
    pub max_components: Option<usize>,
}

impl Default for GaussianFitConfig {
    fn default() -> Self {
        Self {
            lm: LmConfig::default(),
            sigma_divisor: 4.0,
            max_components: None,
        }
    }
}

impl GaussianFitConfig {
    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Affine map between data coordinates and the unit box the optimizer sees.
struct Scaling {
    x_center: f64,
    x_scale: f64,
    y_scale: f64,
}

impl Scaling {
    fn new(x: &[f64], y: &[f64]) -> Self {
        let (lo, hi) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let x_scale = if hi > lo { 0.5 * (hi - lo) } else { 1.0 };
        let y_max = y.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        Self {
            x_center: 0.5 * (lo + hi),
            x_scale,
            y_scale: if y_max > 0.0 { y_max } else { 1.0 },
        }
    }
}

/// Stateless joint Gaussian fitter.
#[derive(Debug, Clone, Default)]
pub struct GaussianFitter {
    config: GaussianFitConfig,
    cancel: Option<CancelToken>,
}

impl GaussianFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GaussianFitConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Attach a cancellation token. A cancelled fit fails with
    /// `FitDidNotConverge`.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &GaussianFitConfig {
        &self.config
    }

    /// Fit one component per guess (or the first `max_components`).
    pub fn fit(
        &self,
        x: &[f64],
        y: &[f64],
        guesses: &[GaussianGuess],
    ) -> Result<GaussianFitResult> {
        let n = self.config.max_components.unwrap_or(guesses.len());
        self.fit_subset(x, y, guesses, n)
    }

    /// Fit the first `min(n, guesses.len())` guesses, keeping their order.
    pub fn fit_subset(
        &self,
        x: &[f64],
        y: &[f64],
        guesses: &[GaussianGuess],
        n: usize,
    ) -> Result<GaussianFitResult> {
        if x.len() != y.len() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "x has {} values, y has {}",
                x.len(),
                y.len()
            )));
        }
        let guesses = &guesses[..n.min(guesses.len())];
        if guesses.is_empty() {
            return Ok(GaussianFitResult::empty(x.len(), y));
        }

        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SpecFitError::InvalidInput(
                "spectrum values must be finite".to_string(),
            ));
        }
        if let Some(i) = guesses.iter().position(|g| !g.is_finite()) {
            return Err(SpecFitError::InvalidInput(format!(
                "guess {} has non-finite bounds",
                i
            )));
        }
        let n_params = 3 * guesses.len();
        if x.len() < n_params {
            return Err(SpecFitError::InsufficientPoints {
                required: n_params,
                got: x.len(),
            });
        }
        if !(self.config.sigma_divisor > 0.0) {
            return Err(SpecFitError::InvalidInput(format!(
                "sigma divisor must be positive, got {}",
                self.config.sigma_divisor
            )));
        }

        let scaling = Scaling::new(x, y);
        let initial = self.initial_params(x, guesses, &scaling);

        let xs = Array1::from_iter(x.iter().map(|v| (v - scaling.x_center) / scaling.x_scale));
        let ys = Array1::from_iter(y.iter().map(|v| v / scaling.y_scale));
        let problem = GaussianSumProblem::new(xs, ys, guesses.len())?;

        let mut optimizer =
            LevenbergMarquardt::with_config(self.config.lm.clone()).with_calc_jacobian(true);
        if let Some(token) = &self.cancel {
            optimizer = optimizer.with_cancel_token(token.clone());
        }
        let result = optimizer.minimize(&problem, initial)?;

        if !result.success {
            log::warn!(
                "Gaussian fit of {} components failed: {}",
                guesses.len(),
                result.message
            );
            return Err(SpecFitError::FitDidNotConverge(result.message));
        }
        if result.params.iter().any(|p| !p.is_finite()) {
            return Err(SpecFitError::FitDidNotConverge(
                "parameters diverged".to_string(),
            ));
        }

        let params: Vec<GaussianParams> = result
            .params
            .exact_chunks(3)
            .into_iter()
            .map(|p| {
                GaussianParams::new(
                    p[0] * scaling.x_scale + scaling.x_center,
                    p[1].abs() * scaling.x_scale,
                    p[2] * scaling.y_scale,
                )
            })
            .collect();
        if params.iter().any(|p| p.sigma == 0.0) {
            return Err(SpecFitError::FitDidNotConverge(
                "a component collapsed to zero width".to_string(),
            ));
        }

        let errors: Option<Vec<GaussianParams>> = result
            .jacobian
            .as_ref()
            .and_then(|jac| standard_errors(jac, &result.residuals).ok())
            .map(|e| {
                e.exact_chunks(3)
                    .into_iter()
                    .map(|p| {
                        GaussianParams::new(
                            p[0] * scaling.x_scale,
                            p[1] * scaling.x_scale,
                            p[2] * scaling.y_scale,
                        )
                    })
                    .collect()
            });

        let components: Vec<Vec<f64>> = params
            .par_iter()
            .map(|p| x.iter().map(|&xi| p.evaluate(xi)).collect())
            .collect();
        let stack: Vec<f64> = (0..x.len())
            .map(|i| components.iter().map(|c| c[i]).sum())
            .collect();
        let sum_sq: f64 = stack
            .iter()
            .zip(y.iter())
            .map(|(s, v)| (s - v).powi(2))
            .sum();
        let rms_residual = (sum_sq / x.len() as f64).sqrt();

        log::info!(
            "fitted {} Gaussian components in {} iterations (rms {:.3e})",
            params.len(),
            result.iterations,
            rms_residual
        );

        Ok(GaussianFitResult {
            stack,
            components,
            params,
            errors,
            iterations: result.iterations,
            rms_residual,
        })
    }

    /// Seed each component from its guess box, in optimizer coordinates:
    /// mean at the box center, sigma the box width over `sigma_divisor`,
    /// amplitude the top of the box.
    fn initial_params(
        &self,
        x: &[f64],
        guesses: &[GaussianGuess],
        scaling: &Scaling,
    ) -> Array1<f64> {
        // Zero-width boxes fall back to the mean sample spacing
        let spacing = if x.len() > 1 {
            2.0 * scaling.x_scale / (x.len() - 1) as f64
        } else {
            1.0
        };

        let mut initial = Vec::with_capacity(3 * guesses.len());
        for guess in guesses.iter().map(GaussianGuess::normalized) {
            let sigma = match guess.width() / self.config.sigma_divisor {
                s if s > 0.0 => s,
                _ => spacing,
            };
            initial.push((guess.center() - scaling.x_center) / scaling.x_scale);
            initial.push(sigma / scaling.x_scale);
            initial.push(guess.ymax / scaling.y_scale);
        }
        Array1::from(initial)
    }
}
