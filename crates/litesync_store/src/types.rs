//! Outcome types shared by the write paths.

use crate::entity::SyncEntity;
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Why a write did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// An entity with the same `(client_id, id)` already exists.
    PrimaryKey,
    /// The client-defined unique tag is held by another live entity.
    ClientTag,
    /// The server-defined unique tag already exists for the client.
    ServerTag,
    /// The stored version did not match the expected version.
    Version,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictKind::PrimaryKey => "primary key",
            ConflictKind::ClientTag => "client tag",
            ConflictKind::ServerTag => "server tag",
            ConflictKind::Version => "version",
        };
        f.write_str(name)
    }
}

/// Result of a conditional write.
///
/// A conflict is a recoverable signal, not an error: nothing from the
/// attempted write was persisted and the caller may retry with fresh state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome<T = ()> {
    /// The write committed.
    Applied(T),
    /// The write was rolled back.
    Conflict(ConflictKind),
}

impl<T> WriteOutcome<T> {
    /// Returns true if the write was rolled back on a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteOutcome::Conflict(_))
    }

    /// Returns true if the write committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied(_))
    }

    /// Returns the conflict kind, if any.
    pub fn conflict(&self) -> Option<ConflictKind> {
        match self {
            WriteOutcome::Conflict(kind) => Some(*kind),
            WriteOutcome::Applied(_) => None,
        }
    }

    /// Consumes the outcome, returning the committed value if any.
    pub fn applied(self) -> Option<T> {
        match self {
            WriteOutcome::Applied(value) => Some(value),
            WriteOutcome::Conflict(_) => None,
        }
    }

    /// Maps the committed value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> WriteOutcome<U> {
        match self {
            WriteOutcome::Applied(value) => WriteOutcome::Applied(f(value)),
            WriteOutcome::Conflict(kind) => WriteOutcome::Conflict(kind),
        }
    }
}

/// Committed result of a version-guarded update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Updated {
    /// Version now stored for the entity.
    pub version: i64,
    /// Whether a client tag shadow row was removed by a tombstone.
    pub tag_released: bool,
}

/// A page of entities returned by [`SyncStore::get_updates_for_type`](crate::SyncStore::get_updates_for_type).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch {
    /// Entities ordered by modification time.
    pub entities: Vec<SyncEntity>,
    /// True when more matching entities exist past this page.
    pub has_changes_remaining: bool,
}

/// Row totals for the whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// All rows, entities and shadow rows.
    pub rows: usize,
    /// Distinct client ids.
    pub clients: usize,
    /// Main entity rows, tombstones included.
    pub entities: usize,
    /// Main entity rows flagged deleted.
    pub tombstones: usize,
    /// `Client#` shadow rows.
    pub client_tags: usize,
    /// `Server#` shadow rows.
    pub server_tags: usize,
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
