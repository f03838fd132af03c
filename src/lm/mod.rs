//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped Gauss-Newton optimizer used by the
//! Gaussian line fitter. Runs are bounded by an iteration cap, an optional
//! wall-clock budget and an optional [`CancelToken`].

pub mod algorithm;
pub mod cancel;
pub mod config;
pub mod convergence;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use cancel::CancelToken;
pub use config::LmConfig;
pub use convergence::ConvergenceStatus;
