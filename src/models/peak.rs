//! Gaussian line profiles.
//!
//! A single component is
//!
//! f(x) = amplitude * exp(-(x - mean)² / (2 * sigma²))
//!
//! and a line model is the sum of any number of components. Parameters are
//! laid out as `[mean, sigma, amplitude]` per component.

use ndarray::{Array1, Array2};

use crate::error::{Result, SpecFitError};
use crate::problem::Problem;

/// Ratio of full width at half maximum to sigma: 2 * sqrt(2 * ln 2).
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

/// Evaluate one Gaussian component at `x`.
pub fn gaussian(x: f64, mean: f64, sigma: f64, amplitude: f64) -> f64 {
    let z = (x - mean) / sigma;
    amplitude * (-0.5 * z * z).exp()
}

/// Partial derivatives of [`gaussian`] with respect to
/// `(mean, sigma, amplitude)`.
pub fn gaussian_gradient(x: f64, mean: f64, sigma: f64, amplitude: f64) -> [f64; 3] {
    let z = (x - mean) / sigma;
    let e = (-0.5 * z * z).exp();
    let d_mean = amplitude * e * z / sigma;
    let d_sigma = amplitude * e * z * z / sigma;
    [d_mean, d_sigma, e]
}

/// Least-squares problem for a sum of Gaussians against observed data.
///
/// Residuals are model minus data.
#[derive(Debug, Clone)]
pub struct GaussianSumProblem {
    x: Array1<f64>,
    y: Array1<f64>,
    components: usize,
}

impl GaussianSumProblem {
    pub fn new(x: Array1<f64>, y: Array1<f64>, components: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(SpecFitError::DimensionMismatch(format!(
                "x has {} values, y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y, components })
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Sum of all components at every abscissa.
    pub fn model(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.check_params(params)?;
        Ok(self.x.mapv(|x| {
            params
                .exact_chunks(3)
                .into_iter()
                .map(|p| gaussian(x, p[0], p[1], p[2]))
                .sum()
        }))
    }

    fn check_params(&self, params: &Array1<f64>) -> Result<()> {
        if params.len() != 3 * self.components {
            return Err(SpecFitError::DimensionMismatch(format!(
                "Expected {} parameters for {} components, got {}",
                3 * self.components,
                self.components,
                params.len()
            )));
        }
        Ok(())
    }
}

impl Problem for GaussianSumProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.model(params)? - &self.y)
    }

    fn parameter_count(&self) -> usize {
        3 * self.components
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.check_params(params)?;
        let mut jac = Array2::zeros((self.x.len(), params.len()));
        for (i, &x) in self.x.iter().enumerate() {
            for k in 0..self.components {
                let (mean, sigma, amplitude) = (params[3 * k], params[3 * k + 1], params[3 * k + 2]);
                let grad = gaussian_gradient(x, mean, sigma, amplitude);
                for (d, g) in grad.iter().enumerate() {
                    jac[[i, 3 * k + d]] = *g;
                }
            }
        }
        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}
