//! Error types for stamp rendering.

use fits_io::FitsError;
use sky_common::StampError;
use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Zero-sized canvas or a pixel buffer that does not match its shape.
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Display range that cannot map values onto the colormap.
    #[error("Invalid display range: {0}")]
    InvalidRange(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Unknown {kind}: {value}")]
    UnknownName { kind: &'static str, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fits(#[from] FitsError),
}

impl From<RenderError> for StampError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Io(e) => StampError::Io(e.to_string()),
            RenderError::Fits(e) => e.into(),
            other => StampError::Render(other.to_string()),
        }
    }
}
