//! Error types for postage-stamp operations.

use thiserror::Error;

/// Result type alias using StampError.
pub type StampResult<T> = Result<T, StampError>;

/// Primary error type for stamp extraction and PSF subtraction.
#[derive(Debug, Error)]
pub enum StampError {
    // === Lookup Errors ===
    #[error("Coordinate (ra={ra}, dec={dec}) is outside all known tiles")]
    Lookup { ra: f64, dec: f64 },

    #[error("Image kind not supported: {0}")]
    UnsupportedKind(String),

    #[error("No stored image for {0}")]
    NotFound(String),

    // === Storage Errors ===
    #[error("Storage read failed: {0}")]
    Io(String),

    #[error("Requested box {requested} is outside stored image {available}")]
    OutOfBounds { requested: String, available: String },

    #[error("Invalid FITS data: {0}")]
    Fits(String),

    // === Model Errors ===
    #[error("No PSF model available for {0}")]
    ModelUnavailable(String),

    #[error("Division by zero: {0}")]
    DivideByZero(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Output Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl StampError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Stable taxonomy name, used in logs and batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            StampError::Lookup { .. } => "LookupError",
            StampError::UnsupportedKind(_) => "UnsupportedKind",
            StampError::NotFound(_) => "NotFound",
            StampError::Io(_) | StampError::Fits(_) => "IOError",
            StampError::OutOfBounds { .. } => "OutOfBounds",
            StampError::ModelUnavailable(_) => "ModelUnavailable",
            StampError::DivideByZero(_) => "DivideByZero",
            StampError::ShapeMismatch(_) => "ShapeMismatch",
            StampError::InvalidParameter { .. } => "InvalidParameter",
            StampError::Render(_) => "RenderError",
        }
    }

    /// Whether the failure came from the storage collaborator.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            StampError::NotFound(_)
                | StampError::Io(_)
                | StampError::Fits(_)
                | StampError::OutOfBounds { .. }
        )
    }
}

impl From<std::io::Error> for StampError {
    fn from(err: std::io::Error) -> Self {
        StampError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StampError {
    fn from(err: serde_json::Error) -> Self {
        StampError::Io(format!("JSON error: {}", err))
    }
}
