//! FITS files for stamp images, mask planes and TAN world coordinates.
//!
//! Files are read and written through `fitsio` (cfitsio). A stamp file is an
//! empty primary HDU followed by named 2D image extensions: `FLOAT_IMG` for
//! pixels and variance, `LONG_IMG` for mask planes.
//!
//! Image extensions carry their parent-frame origin as `LTV1`/`LTV2`
//! (negated `xy0`) and may carry a gnomonic WCS (`RA---TAN`/`DEC--TAN` with a
//! CD matrix). Reads are bounded: only the rows covering the requested box are
//! decoded, and a read whose pixels would lie past the end of the file fails
//! before anything is allocated.

pub mod hdu;
pub mod header;
pub mod io;
pub mod wcs;

use sky_common::StampError;
use thiserror::Error;

pub use hdu::ImageHdu;
pub use header::{Card, FitsValue, Header, KeyKind};
pub use io::{FitsReader, FitsWriter};
pub use wcs::{read_tan_wcs, write_tan_wcs, WCS_KEYS};

/// Result type for FITS operations.
pub type FitsResult<T> = Result<T, FitsError>;

/// Error types for FITS reading and writing.
#[derive(Error, Debug)]
pub enum FitsError {
    /// Error reported by cfitsio
    #[error("FITS error: {0}")]
    Fitsio(#[from] fitsio::errors::Error),

    /// Non-zero cfitsio status from a direct call
    #[error("cfitsio status {status} writing {key}")]
    Status { key: String, status: i32 },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required keyword absent from a header
    #[error("Missing required keyword: {0}")]
    MissingKeyword(String),

    /// Keyword present with an unusable value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Extension {name} has pixel type {found}, expected {expected}")]
    UnsupportedType {
        name: String,
        found: String,
        expected: &'static str,
    },

    #[error("Extension {name} has {naxis} axes (only 2 are handled)")]
    UnsupportedNaxis { name: String, naxis: usize },

    /// Named extension absent or unreadable
    #[error("No HDU named {name}: {source}")]
    HduNotFound {
        name: String,
        #[source]
        source: fitsio::errors::Error,
    },

    /// Requested box not inside the extension
    #[error("Box {requested} outside extension {available}")]
    OutsideImage { requested: String, available: String },

    /// Header declares more pixel data than the file holds
    #[error("Extension {name} needs {needed} bytes of data but the file has {available}")]
    DataPastEnd { name: String, needed: u64, available: u64 },
}

impl FitsError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        FitsError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<FitsError> for StampError {
    fn from(err: FitsError) -> Self {
        match err {
            FitsError::OutsideImage { requested, available } => StampError::OutOfBounds { requested, available },
            err @ (FitsError::Fitsio(_)
            | FitsError::Status { .. }
            | FitsError::Io(_)
            | FitsError::HduNotFound { .. }
            | FitsError::DataPastEnd { .. }) => StampError::Io(err.to_string()),
            other => StampError::Fits(other.to_string()),
        }
    }
}
