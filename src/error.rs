use thiserror::Error;

/// Error types for the specfit-rs library.
#[derive(Error, Debug)]
pub enum SpecFitError {
    /// Missing or degenerate axis metadata (WCS keys, rest frequency).
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Too few distinct baseline anchors for the requested polynomial order.
    #[error("Insufficient points: order needs at least {required} distinct points, got {got}")]
    InsufficientPoints { required: usize, got: usize },

    /// The Gaussian optimizer failed, diverged, timed out or was cancelled.
    #[error("Fit did not converge: {0}")]
    FitDidNotConverge(String),

    /// Error indicating a mismatch in array or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current state of the spectrum model.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A display unit name that could not be parsed.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpecFitError {
    /// Whether the caller can reasonably recover by changing its input
    /// (more anchors, a lower order, different guess ranges).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SpecFitError::InsufficientPoints { .. } | SpecFitError::FitDidNotConverge(_)
        )
    }
}

/// Result type alias for specfit-rs operations.
pub type Result<T> = std::result::Result<T, SpecFitError>;
