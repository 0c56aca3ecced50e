//! Catalog error types.

use thiserror::Error;

use sky_common::StampError;

/// Errors from catalog loading and queries.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Malformed predicate string.
    #[error("Invalid predicate '{input}': {reason}")]
    Predicate { input: String, reason: String },

    /// Column not present in the catalog (stored, derived or native).
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// No catalog registered under this name.
    #[error("Catalog not found: {0}")]
    NotFound(String),

    /// Literal and column value types differ.
    #[error("Type mismatch on '{column}': {message}")]
    TypeMismatch { column: String, message: String },

    /// Catalog file content is inconsistent.
    #[error("Invalid catalog: {0}")]
    Schema(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub(crate) fn predicate(input: &str, reason: impl Into<String>) -> Self {
        CatalogError::Predicate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<CatalogError> for StampError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(name) => StampError::NotFound(format!("catalog {}", name)),
            CatalogError::Io(e) => StampError::Io(e.to_string()),
            CatalogError::Json(e) => StampError::Io(e.to_string()),
            CatalogError::Predicate { .. } => StampError::invalid_parameter("filter", err.to_string()),
            CatalogError::UnknownColumn(_) | CatalogError::TypeMismatch { .. } => {
                StampError::invalid_parameter("column", err.to_string())
            }
            CatalogError::Schema(_) => StampError::Io(err.to_string()),
        }
    }
}
