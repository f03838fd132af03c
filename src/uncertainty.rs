//! # Covariance Matrix Calculations
//!
//! Parameter uncertainties of a converged least-squares fit, estimated from
//! the Jacobian at the solution:
//!
//!   covar = redchi * inv(J^T * J)
//!
//! where redchi is the reduced chi-square `sum(r^2) / (m - n)`.

use ndarray::{Array1, Array2};

use crate::error::{Result, SpecFitError};
use crate::utils::linalg::invert_spd;

/// Reduced chi-square of the residuals for `n_params` fitted parameters.
///
/// `None` when there are no degrees of freedom left.
pub fn reduced_chi_square(residuals: &Array1<f64>, n_params: usize) -> Option<f64> {
    let dof = residuals.len().checked_sub(n_params).filter(|&d| d > 0)?;
    let chi_square: f64 = residuals.iter().map(|r| r * r).sum();
    Some(chi_square / dof as f64)
}

/// Calculate the covariance matrix from the Jacobian matrix.
///
/// Fails with `SingularMatrix` when `J^T J` is not positive definite, which
/// happens when a parameter does not influence the residuals at all.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    let inverse = invert_spd(&jtj).ok_or(SpecFitError::SingularMatrix)?;
    Ok(inverse * redchi)
}

/// Calculate the correlation matrix from the covariance matrix.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let scale = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if scale > 0.0 {
            covar[[i, j]] / scale
        } else {
            0.0
        }
    })
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}

/// Standard errors of the fitted parameters, straight from the Jacobian and
/// residuals at the solution.
pub fn standard_errors(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Result<Array1<f64>> {
    let n_params = jacobian.ncols();
    let redchi = reduced_chi_square(residuals, n_params).ok_or_else(|| {
        SpecFitError::InsufficientPoints {
            required: n_params + 1,
            got: residuals.len(),
        }
    })?;
    let covar = calculate_covariance(jacobian, redchi)?;
    Ok(standard_errors_from_covariance(&covar))
}
