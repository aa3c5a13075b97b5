//! Error types for store operations.
//!
//! Uniqueness and version conflicts are not errors: they are reported as
//! [`WriteOutcome::Conflict`](crate::WriteOutcome::Conflict). Everything in
//! [`StoreError`] is fatal for the operation that produced it.

use rusqlite::ErrorCode;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported a failure that is not a uniqueness conflict.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The entity is missing a required identifier.
    #[error("invalid entity: {message}")]
    InvalidEntity {
        /// Description of the problem.
        message: String,
    },

    /// The store configuration cannot be used.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid entity error.
    pub fn invalid_entity(message: impl Into<String>) -> Self {
        Self::InvalidEntity {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    ///
    /// Only lock contention qualifies; a caller error never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Returns true if this error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidEntity { .. } | StoreError::InvalidConfig { .. }
        )
    }
}
