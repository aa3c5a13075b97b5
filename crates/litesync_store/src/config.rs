//! Store configuration.

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal (`DELETE`).
    Delete,
    /// Write-ahead log.
    Wal,
}

impl JournalMode {
    fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
        }
    }
}

/// SQLite `synchronous` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronousMode {
    /// Sync at every critical moment.
    Full,
    /// Sync less often; safe with WAL.
    Normal,
    /// Leave syncing to the OS.
    Off,
}

impl SynchronousMode {
    fn as_pragma(self) -> &'static str {
        match self {
            SynchronousMode::Full => "FULL",
            SynchronousMode::Normal => "NORMAL",
            SynchronousMode::Off => "OFF",
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file path, or [`MEMORY_PATH`].
    pub path: PathBuf,

    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,

    /// Journal mode applied on open.
    pub journal_mode: JournalMode,

    /// Synchronous mode applied on open.
    pub synchronous: SynchronousMode,

    /// How long a statement waits for a competing writer before failing
    /// with a retryable busy error.
    pub busy_timeout: Duration,

    /// Whether to create the schema when opening.
    pub create_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./litesync.sqlite"),
            create_if_missing: true,
            journal_mode: JournalMode::Wal,
            synchronous: SynchronousMode::Normal,
            busy_timeout: Duration::from_secs(5),
            create_schema: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }

    /// Sets whether to create the database file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the journal mode.
    #[must_use]
    pub const fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Sets the synchronous mode.
    #[must_use]
    pub const fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether opening creates the schema.
    #[must_use]
    pub const fn create_schema(mut self, value: bool) -> Self {
        self.create_schema = value;
        self
    }

    /// Returns true if this configuration opens an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(MEMORY_PATH)
    }

    /// Checks the configuration for values that cannot be opened.
    pub fn validate(&self) -> StoreResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::invalid_config("database path must not be empty"));
        }
        if !self.is_in_memory() && !self.create_if_missing && !self.path.exists() {
            return Err(StoreError::invalid_config(format!(
                "database {} does not exist",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Applies the connection-level settings.
    pub(crate) fn configure(&self, conn: &Connection) -> StoreResult<()> {
        conn.busy_timeout(self.busy_timeout)?;
        // journal_mode reports the resulting mode; in-memory databases stay "memory".
        let _mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            self.journal_mode.as_pragma(),
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", self.synchronous.as_pragma())?;
        Ok(())
    }
}
