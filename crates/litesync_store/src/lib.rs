//! # LiteSync Store
//!
//! SQLite storage for a browser-sync server.
//!
//! This crate persists sync entities with the conditional-write semantics
//! the sync protocol expects from a key-value store:
//! - Insert with per-client unique tag emulation
//! - All-or-nothing batch insert guarded by server-defined tags
//! - Version-guarded update with tombstone tag release
//!
//! ## Layout
//!
//! Everything lives in one table, `sync_entities`, keyed by
//! `(client_id, id)`. Unique tags are reserved by shadow rows in the same
//! table (see [`tags`]), so the primary key is what enforces them.
//!
//! ## Conflicts
//!
//! Uniqueness and version mismatches are reported as
//! [`WriteOutcome::Conflict`], not as errors. A conflicting write is rolled
//! back in full. [`StoreError`] is reserved for failures the caller cannot
//! fix by re-reading state.
//!
//! ## Example
//!
//! ```rust
//! use litesync_store::{ConflictKind, SyncEntity, SyncStore};
//!
//! let store = SyncStore::open_in_memory().unwrap();
//! store.create_schema().unwrap();
//!
//! let bookmark = SyncEntity::new("client1", "e1")
//!     .with_version(1)
//!     .with_client_tag("bookmark-bar");
//! assert!(store.insert_sync_entity(&bookmark).unwrap().is_applied());
//!
//! let twin = SyncEntity::new("client1", "e2").with_client_tag("bookmark-bar");
//! let outcome = store.insert_sync_entity(&twin).unwrap();
//! assert_eq!(outcome.conflict(), Some(ConflictKind::ClientTag));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod conflict;
mod datastore;
mod entity;
mod error;
pub mod schema;
mod store;
pub mod tags;
mod txn;
mod types;

pub use config::{JournalMode, StoreConfig, SynchronousMode, MEMORY_PATH};
pub use conflict::{classify, Violation};
pub use datastore::Datastore;
pub use entity::SyncEntity;
pub use error::{StoreError, StoreResult};
pub use store::SyncStore;
pub use tags::{TagItem, TagKind};
pub use txn::{Abort, TxnResult};
pub use types::{ConflictKind, StoreStats, UpdateBatch, Updated, WriteOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
