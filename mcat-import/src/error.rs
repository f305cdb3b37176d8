//! Error types for mcat-import
//!
//! Row-level failures (missing ISBN, lookup failures) are recoverable:
//! the driver skips the row and keeps going. Anything touching the
//! store or the input stream is fatal and forces a rollback.

use crate::services::openlibrary_client::LookupError;
use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Import error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Row has no usable ISBN value (recoverable: row is skipped)
    #[error("row has no ISBN value")]
    MissingIsbn,

    /// Lookup service failure (recoverable: row is skipped)
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Reserved: duplicates are resolved by natural-key lookup, so this
    /// is currently never constructed. Would be fatal if introduced.
    #[error("entity conflict: {0}")]
    EntityConflict(String),

    /// Storage failure during staging (fatal: forces rollback)
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Input file could not be read or parsed (fatal)
    #[error("input error: {0}")]
    Csv(#[from] csv::Error),

    /// mcat-common error
    #[error(transparent)]
    Common(#[from] mcat_common::Error),
}

impl ImportError {
    /// True when the error only invalidates one row, not the run
    pub fn is_row_recoverable(&self) -> bool {
        matches!(self, ImportError::MissingIsbn | ImportError::Lookup(_))
    }
}
