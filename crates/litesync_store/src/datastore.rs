//! Storage capability set consumed by the sync protocol engine.

use crate::entity::SyncEntity;
use crate::error::StoreResult;
use crate::store::SyncStore;
use crate::types::{UpdateBatch, Updated, WriteOutcome};

/// The operations a sync engine needs from its entity storage.
///
/// The engine reaches storage only through this trait, so any backend
/// honoring the conditional-write contract can stand in for [`SyncStore`].
///
/// # Invariants
///
/// - Conflicts are outcomes, never errors
/// - A conflicting write persists nothing
/// - `insert_sync_entities_with_server_tags` is all-or-nothing per call
/// - Implementors must be `Send + Sync`
pub trait Datastore: Send + Sync {
    /// Inserts one entity, reserving its client-defined tag.
    fn insert_sync_entity(&self, entity: &SyncEntity) -> StoreResult<WriteOutcome>;

    /// Inserts a batch atomically, reserving server-defined tags.
    fn insert_sync_entities_with_server_tags(
        &self,
        entities: &[SyncEntity],
    ) -> StoreResult<WriteOutcome>;

    /// Updates an entity if its stored version equals `expected_version`.
    fn update_sync_entity(
        &self,
        entity: &SyncEntity,
        expected_version: i64,
    ) -> StoreResult<WriteOutcome<Updated>>;

    /// Returns entities of a type modified after `client_token`.
    fn get_updates_for_type(
        &self,
        data_type: i64,
        client_token: i64,
        fetch_folders: bool,
        client_id: &str,
        max_size: usize,
    ) -> StoreResult<UpdateBatch>;

    /// Returns true if a server-defined tag is reserved for the client.
    fn has_server_defined_unique_tag(&self, client_id: &str, tag: &str) -> StoreResult<bool>;

    /// Counts all rows owned by a client.
    fn get_client_item_count(&self, client_id: &str) -> StoreResult<usize>;

    /// Records a client's item count.
    fn update_client_item_count(&self, client_id: &str, count: usize) -> StoreResult<()>;

    /// Tombstones all of a client's data, returning the tombstones.
    fn clear_server_data(&self, client_id: &str) -> StoreResult<Vec<SyncEntity>>;

    /// Disables a client's sync chain.
    fn disable_sync_chain(&self, client_id: &str) -> StoreResult<()>;

    /// Returns true if a client's sync chain is disabled.
    fn is_sync_chain_disabled(&self, client_id: &str) -> StoreResult<bool>;
}

impl Datastore for SyncStore {
    fn insert_sync_entity(&self, entity: &SyncEntity) -> StoreResult<WriteOutcome> {
        SyncStore::insert_sync_entity(self, entity)
    }

    fn insert_sync_entities_with_server_tags(
        &self,
        entities: &[SyncEntity],
    ) -> StoreResult<WriteOutcome> {
        SyncStore::insert_sync_entities_with_server_tags(self, entities)
    }

    fn update_sync_entity(
        &self,
        entity: &SyncEntity,
        expected_version: i64,
    ) -> StoreResult<WriteOutcome<Updated>> {
        SyncStore::update_sync_entity(self, entity, expected_version)
    }

    fn get_updates_for_type(
        &self,
        data_type: i64,
        client_token: i64,
        fetch_folders: bool,
        client_id: &str,
        max_size: usize,
    ) -> StoreResult<UpdateBatch> {
        SyncStore::get_updates_for_type(
            self,
            data_type,
            client_token,
            fetch_folders,
            client_id,
            max_size,
        )
    }

    fn has_server_defined_unique_tag(&self, client_id: &str, tag: &str) -> StoreResult<bool> {
        SyncStore::has_server_defined_unique_tag(self, client_id, tag)
    }

    fn get_client_item_count(&self, client_id: &str) -> StoreResult<usize> {
        SyncStore::get_client_item_count(self, client_id)
    }

    fn update_client_item_count(&self, client_id: &str, count: usize) -> StoreResult<()> {
        SyncStore::update_client_item_count(self, client_id, count)
    }

    fn clear_server_data(&self, client_id: &str) -> StoreResult<Vec<SyncEntity>> {
        SyncStore::clear_server_data(self, client_id)
    }

    fn disable_sync_chain(&self, client_id: &str) -> StoreResult<()> {
        SyncStore::disable_sync_chain(self, client_id)
    }

    fn is_sync_chain_disabled(&self, client_id: &str) -> StoreResult<bool> {
        SyncStore::is_sync_chain_disabled(self, client_id)
    }
}
