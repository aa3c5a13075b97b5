//! Run-under-transaction helper.
//!
//! Every mutating operation is a closure executed by [`run`]. The closure
//! either returns a value, which commits, or an [`Abort`], which rolls the
//! whole transaction back. Dropping a `rusqlite::Transaction` without
//! committing also rolls back, so a panic or early return inside the unit of
//! work can never leave partial writes behind.

use crate::error::{StoreError, StoreResult};
use crate::types::{ConflictKind, WriteOutcome};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{trace, warn};

/// Reason a unit of work stopped before commit.
#[derive(Debug)]
pub enum Abort {
    /// A recoverable conflict; reported as [`WriteOutcome::Conflict`].
    Conflict(ConflictKind),
    /// A fatal error; reported as `Err`.
    Fatal(StoreError),
}

impl Abort {
    /// Creates a conflict abort.
    pub fn conflict(kind: ConflictKind) -> Self {
        Self::Conflict(kind)
    }
}

impl From<StoreError> for Abort {
    fn from(err: StoreError) -> Self {
        Self::Fatal(err)
    }
}

impl From<rusqlite::Error> for Abort {
    fn from(err: rusqlite::Error) -> Self {
        Self::Fatal(StoreError::Sqlite(err))
    }
}

/// Result type for a unit of work.
pub type TxnResult<T> = Result<T, Abort>;

/// Executes `f` inside a transaction on the shared connection.
///
/// Commits when `f` returns `Ok`. Rolls back on any abort; a conflict
/// becomes `Ok(WriteOutcome::Conflict)`, a fatal abort becomes `Err`.
pub(crate) fn run<T, F>(
    conn: &Mutex<Connection>,
    behavior: TransactionBehavior,
    f: F,
) -> StoreResult<WriteOutcome<T>>
where
    F: FnOnce(&Transaction<'_>) -> TxnResult<T>,
{
    let mut conn = conn.lock();
    let tx = conn.transaction_with_behavior(behavior)?;

    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            trace!("transaction committed");
            Ok(WriteOutcome::Applied(value))
        }
        Err(Abort::Conflict(kind)) => {
            tx.rollback()?;
            trace!(%kind, "transaction rolled back on conflict");
            Ok(WriteOutcome::Conflict(kind))
        }
        Err(Abort::Fatal(err)) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback after fatal error failed");
            }
            Err(err)
        }
    }
}

/// Executes a read-only `f` inside a deferred transaction.
pub(crate) fn read<T, F>(conn: &Mutex<Connection>, f: F) -> StoreResult<T>
where
    F: FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
{
    let mut conn = conn.lock();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Mutex<Connection> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (k TEXT PRIMARY KEY)", [])
            .unwrap();
        Mutex::new(conn)
    }

    fn count(conn: &Mutex<Connection>) -> i64 {
        conn.lock()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commit_on_success() {
        let conn = conn();
        let outcome = run(&conn, TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO t VALUES ('a')", [])?;
            tx.execute("INSERT INTO t VALUES ('b')", [])?;
            Ok(2)
        })
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Applied(2));
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn rollback_on_conflict() {
        let conn = conn();
        let outcome = run(&conn, TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO t VALUES ('a')", [])?;
            Err::<(), _>(Abort::conflict(ConflictKind::ServerTag))
        })
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Conflict(ConflictKind::ServerTag));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn rollback_on_fatal() {
        let conn = conn();
        let result = run(&conn, TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO t VALUES ('a')", [])?;
            tx.execute("INSERT INTO nope VALUES ('b')", [])?;
            Ok(())
        });

        assert!(matches!(result, Err(StoreError::Sqlite(_))));
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn connection_usable_after_abort() {
        let conn = conn();
        let _ = run(&conn, TransactionBehavior::Immediate, |_| {
            Err::<(), _>(Abort::from(StoreError::invalid_entity("boom")))
        });
        let outcome = run(&conn, TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO t VALUES ('a')", [])?;
            Ok(())
        })
        .unwrap();
        assert!(outcome.is_applied());
    }

    #[test]
    fn read_sees_committed_rows() {
        let conn = conn();
        run(&conn, TransactionBehavior::Immediate, |tx| {
            tx.execute("INSERT INTO t VALUES ('a')", [])?;
            Ok(())
        })
        .unwrap();

        let n: i64 = read(&conn, |tx| {
            tx.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
        })
        .unwrap();
        assert_eq!(n, 1);
    }
}
