//! Benchmark utilities.

use litesync_store::{StoreConfig, SyncEntity, SyncStore};
use rand::Rng;
use tempfile::TempDir;

/// Bookmarks data type used for generated entities.
pub const BENCH_DATA_TYPE: i64 = 32904;

/// Generate random specifics of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate live entities for one client with the given payload size.
pub fn generate_entities(client_id: &str, count: usize, payload_size: usize) -> Vec<SyncEntity> {
    (0..count)
        .map(|i| {
            let mtime = i64::try_from(i).unwrap_or(i64::MAX);
            SyncEntity::new(client_id, new_id())
                .with_version(1)
                .with_times(mtime, mtime)
                .with_data_type(BENCH_DATA_TYPE)
                .with_specifics(random_data(payload_size))
        })
        .collect()
}

/// Opens an in-memory store with the schema in place.
pub fn memory_store() -> SyncStore {
    let store = SyncStore::open_in_memory().expect("open in-memory store");
    store.create_schema().expect("create schema");
    store
}

/// Opens a file-backed store in a temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn file_store() -> (SyncStore, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = SyncStore::open(&StoreConfig::new(dir.path().join("bench.sqlite")))
        .expect("open file store");
    (store, dir)
}
