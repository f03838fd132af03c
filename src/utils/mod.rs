//! Numerical helpers shared by the fitters.

#[cfg(feature = "lm")]
pub mod finite_difference;
pub mod linalg;
pub mod matrix_convert;

pub use linalg::{cholesky_solve, invert_spd, lstsq};
pub use matrix_convert::{
    faer_to_ndarray, faer_vec_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer,
};
