//! Uniqueness violation detection.
//!
//! SQLite reports every constraint failure as `SQLITE_CONSTRAINT`; the
//! extended code tells a primary key collision from a unique index
//! collision. Only those two become conflicts. NOT NULL, CHECK and every
//! non-constraint failure stay fatal.

use crate::txn::{Abort, TxnResult};
use crate::types::ConflictKind;
use rusqlite::{ffi, ErrorCode};

/// A uniqueness constraint that rejected a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The `(client_id, id)` primary key.
    PrimaryKey,
    /// A unique index, i.e. the partial client tag index.
    Unique,
}

/// Classifies a SQLite error as a uniqueness violation.
///
/// Returns `None` for anything that must be treated as fatal.
pub fn classify(err: &rusqlite::Error) -> Option<Violation> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Violation::PrimaryKey),
                ffi::SQLITE_CONSTRAINT_UNIQUE => Some(Violation::Unique),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Turns uniqueness violations on a statement result into conflict aborts.
pub(crate) trait OnConflict<T> {
    /// Maps a violation through `kind`; other errors abort as fatal.
    fn on_conflict<F>(self, kind: F) -> TxnResult<T>
    where
        F: FnOnce(Violation) -> ConflictKind;
}

impl<T> OnConflict<T> for rusqlite::Result<T> {
    fn on_conflict<F>(self, kind: F) -> TxnResult<T>
    where
        F: FnOnce(Violation) -> ConflictKind,
    {
        self.map_err(|err| match classify(&err) {
            Some(violation) => Abort::Conflict(kind(violation)),
            None => Abort::from(err),
        })
    }
}
