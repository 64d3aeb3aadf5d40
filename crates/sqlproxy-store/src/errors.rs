//! Error handling for sqlproxy-store
//!
//! Wraps sqlproxy-core ExError with store-specific helpers

use sqlproxy_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an error for a connection mutex poisoned by a panicking holder
pub fn lock_poisoned() -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("sqlite_lock")
        .with_message("connection lock poisoned")
}

/// Create an error for a statement using positional `?` placeholders
pub fn positional_parameter(index: usize) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("sqlite_bind")
        .with_message(format!(
            "parameter {} is positional; only :name placeholders are supported",
            index
        ))
}
