//! Conversion between ndarray and faer containers.
//!
//! Model code works on ndarray; the optimizer forms its normal-equation
//! products with faer. Both directions copy element by element since
//! ndarray is row-major and faer column-major.

use faer::{Col, Mat};
use ndarray::{Array1, Array2};

/// Convert an ndarray `Array2` to a faer `Mat`.
pub fn ndarray_to_faer(arr: &Array2<f64>) -> Mat<f64> {
    Mat::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

/// Convert a faer `Mat` to an ndarray `Array2`.
pub fn faer_to_ndarray(mat: &Mat<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Convert an ndarray `Array1` to a faer column vector.
pub fn ndarray_vec_to_faer(arr: &Array1<f64>) -> Col<f64> {
    Col::from_fn(arr.len(), |i| arr[i])
}

/// Convert a faer column vector to an ndarray `Array1`.
pub fn faer_vec_to_ndarray(col: &Col<f64>) -> Array1<f64> {
    Array1::from_shape_fn(col.nrows(), |i| col[i])
}
