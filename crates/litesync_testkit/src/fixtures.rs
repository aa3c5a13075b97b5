//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use litesync_store::{StoreConfig, SyncEntity, SyncStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Modification and creation time used by [`sample_entity`].
pub const SAMPLE_TIME: i64 = 12_345_678;

/// Data type used by [`sample_entity`].
pub const SAMPLE_DATA_TYPE: i64 = 123;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: SyncStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store with the schema in place.
    pub fn memory() -> Self {
        let store = SyncStore::open_in_memory().expect("Failed to open in-memory store");
        store.create_schema().expect("Failed to create schema");
        Self {
            store,
            _temp_dir: None,
        }
    }

    /// Creates a new file-backed test store in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("litesync.sqlite");
        let store = SyncStore::open(&StoreConfig::new(path)).expect("Failed to open file store");
        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|d| d.path().join("litesync.sqlite"))
    }
}

impl std::ops::Deref for TestStore {
    type Target = SyncStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use litesync_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         assert_eq!(store.get_client_item_count("client1").unwrap(), 0);
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SyncStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-backed store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&SyncStore, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Returns a fresh random entity id.
pub fn new_entity_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Builds a fully populated live entity.
///
/// Version 1, both timestamps [`SAMPLE_TIME`], data type
/// [`SAMPLE_DATA_TYPE`], not a folder, not deleted.
pub fn sample_entity(client_id: &str, id: &str) -> SyncEntity {
    SyncEntity::new(client_id, id)
        .with_version(1)
        .with_times(SAMPLE_TIME, SAMPLE_TIME)
        .with_data_type(SAMPLE_DATA_TYPE)
        .with_folder(false)
        .with_deleted(false)
        .with_specifics(vec![1, 2])
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a store holding `count` untagged entities for `client_id`.
    pub fn populated_store(client_id: &str, count: usize) -> TestStore {
        let test_store = TestStore::memory();
        for _ in 0..count {
            let entity = sample_entity(client_id, &new_entity_id());
            let outcome = test_store
                .insert_sync_entity(&entity)
                .expect("Failed to insert entity");
            assert!(outcome.is_applied(), "random id collided");
        }
        test_store
    }

    /// Creates a store where `client_id` holds one entity per tag.
    ///
    /// Entity ids are `e0`, `e1`, ... in tag order.
    pub fn tagged_store(client_id: &str, tags: &[&str]) -> TestStore {
        let test_store = TestStore::memory();
        for (i, tag) in tags.iter().enumerate() {
            let entity = sample_entity(client_id, &format!("e{i}")).with_client_tag(*tag);
            let outcome = test_store
                .insert_sync_entity(&entity)
                .expect("Failed to insert entity");
            assert!(outcome.is_applied(), "duplicate tag in scenario");
        }
        test_store
    }
}
