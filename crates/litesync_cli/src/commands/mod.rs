//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod scan;

use litesync_store::{StoreConfig, SyncStore};
use std::path::Path;
use thiserror::Error;

/// Errors raised by the maintenance commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No database file at the given path.
    #[error("no database found at {0}")]
    NotFound(String),

    /// Store failure.
    #[error("store error: {0}")]
    Store(#[from] litesync_store::StoreError),

    /// Output encoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for commands.
pub type CommandResult<T> = Result<T, CommandError>;

/// Output format shared by the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Opens an existing store without creating the file or the schema.
pub fn open_existing(path: &Path) -> CommandResult<SyncStore> {
    if !path.exists() {
        return Err(CommandError::NotFound(path.display().to_string()));
    }
    let config = StoreConfig::new(path)
        .create_if_missing(false)
        .create_schema(false);
    Ok(SyncStore::open(&config)?)
}
