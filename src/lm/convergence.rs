//! Termination states of the optimizer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why an optimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// Converged due to a small parameter change.
    ParameterConvergence,

    /// Converged due to a small actual and predicted cost change.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// Terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated because no damping value produced a downhill step.
    DampingSaturated,

    /// Terminated because the wall-clock budget was used up.
    TimeLimitReached,

    /// Terminated by a cancellation request.
    Cancelled,

    /// Terminated because residuals or parameters became NaN or infinite.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small cost change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingSaturated => "Terminated: damping reached its maximum",
            ConvergenceStatus::TimeLimitReached => "Terminated: time limit reached",
            ConvergenceStatus::Cancelled => "Terminated: cancelled",
            ConvergenceStatus::NumericalError => "Terminated: numerical error",
        }
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
