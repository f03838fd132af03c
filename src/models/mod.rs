//! Model functions used by the fitters.
//!
//! [`Polynomial`] describes the continuum baseline, [`GaussianSumProblem`]
//! the line profile that is fitted on top of the baseline-subtracted data.

mod peak;
mod polynomial;

// Re-export the models
pub use peak::{gaussian, gaussian_gradient, GaussianSumProblem, FWHM_PER_SIGMA};
pub use polynomial::Polynomial;
