//! Small dense solvers.
//!
//! The systems solved here are tiny (a handful of polynomial coefficients,
//! three parameters per Gaussian), so plain loops over ndarray storage are
//! sufficient.

use ndarray::{Array1, Array2};

use crate::error::{Result, SpecFitError};

/// Solve the linear least-squares problem `min ||A x - b||` with Householder QR.
///
/// Fails with `SingularMatrix` when `A` is numerically rank deficient.
pub fn lstsq(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let (m, n) = a.dim();
    if b.len() != m {
        return Err(SpecFitError::DimensionMismatch(format!(
            "matrix has {} rows, right-hand side has {} entries",
            m,
            b.len()
        )));
    }
    if m < n || n == 0 {
        return Err(SpecFitError::DimensionMismatch(format!(
            "least squares needs rows >= columns > 0, got {}x{}",
            m, n
        )));
    }

    let mut r = a.to_owned();
    let mut qtb = b.to_owned();

    for k in 0..n {
        let norm = (k..m).map(|i| r[[i, k]] * r[[i, k]]).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        let alpha = if r[[k, k]] > 0.0 { -norm } else { norm };

        // Householder vector v = x - alpha * e1
        let mut v: Vec<f64> = (k..m).map(|i| r[[i, k]]).collect();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|x| x * x).sum();
        if v_norm2 == 0.0 {
            continue;
        }

        for j in k..n {
            let dot: f64 = (k..m).map(|i| v[i - k] * r[[i, j]]).sum();
            let f = 2.0 * dot / v_norm2;
            for i in k..m {
                r[[i, j]] -= f * v[i - k];
            }
        }
        let dot: f64 = (k..m).map(|i| v[i - k] * qtb[i]).sum();
        let f = 2.0 * dot / v_norm2;
        for i in k..m {
            qtb[i] -= f * v[i - k];
        }
    }

    let max_diag = (0..n).map(|i| r[[i, i]].abs()).fold(0.0, f64::max);
    let tol = max_diag * (m as f64) * f64::EPSILON;
    if max_diag == 0.0 || !max_diag.is_finite() {
        return Err(SpecFitError::SingularMatrix);
    }

    // Back substitution R x = Q^T b
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        if r[[i, i]].abs() <= tol {
            return Err(SpecFitError::SingularMatrix);
        }
        let s = qtb[i] - ((i + 1)..n).map(|j| r[[i, j]] * x[j]).sum::<f64>();
        x[i] = s / r[[i, i]];
    }

    Ok(x)
}

/// Lower Cholesky factor of a symmetric positive definite matrix.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return None;
    }
    let mut l = Array2::zeros((n, n));

    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        if !(d > 0.0 && d.is_finite()) {
            return None;
        }
        let l_jj = d.sqrt();
        l[[j, j]] = l_jj;

        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / l_jj;
        }
    }

    Some(l)
}

/// Solve `A x = b` for symmetric positive definite `A`.
///
/// Returns `None` if `A` is not positive definite.
pub fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let l = cholesky(a)?;
    Some(solve_factored(&l, b))
}

/// Inverse of a symmetric positive definite matrix.
pub fn invert_spd(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = cholesky(a)?;
    let n = a.nrows();
    let mut inv = Array2::zeros((n, n));
    for col in 0..n {
        let mut e = Array1::zeros(n);
        e[col] = 1.0;
        let x = solve_factored(&l, &e);
        inv.column_mut(col).assign(&x);
    }
    Some(inv)
}

fn solve_factored(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution (L * y = b)
    let mut y = b.to_owned();
    for i in 0..n {
        for j in 0..i {
            y[i] -= l[[i, j]] * y[j];
        }
        y[i] /= l[[i, i]];
    }

    // Backward substitution (L^T * x = y)
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = y[i];
        for j in (i + 1)..n {
            x[i] -= l[[j, i]] * x[j];
        }
        x[i] /= l[[i, i]];
    }
    x
}
