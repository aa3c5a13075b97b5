//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random sync entities and
//! operation sequences. Generated ids never carry a shadow tag prefix.

use litesync_store::SyncEntity;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating client ids.
pub fn client_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("client[0-9]{1,2}").expect("Invalid regex")
}

/// Strategy for generating entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating unique tags from a small alphabet, so that
/// generated sequences collide often.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("tag[a-e]").expect("Invalid regex")
}

/// Strategy for generating opaque specifics payloads.
pub fn specifics_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Strategy for generating a live entity owned by `client_id`.
pub fn entity_strategy(client_id: String) -> impl Strategy<Value = SyncEntity> {
    (
        entity_id_strategy(),
        1i64..1_000,
        1i64..1_000_000,
        prop::option::of(tag_strategy()),
        specifics_strategy(),
        any::<bool>(),
    )
        .prop_map(move |(id, version, mtime, tag, specifics, folder)| {
            let mut entity = SyncEntity::new(client_id.clone(), id)
                .with_version(version)
                .with_times(mtime, mtime)
                .with_data_type(47745)
                .with_folder(folder)
                .with_deleted(false)
                .with_specifics(specifics);
            entity.client_defined_unique_tag = tag;
            entity
        })
}

/// Strategy for generating a server-tagged batch for one client.
///
/// Ids and server tags are distinct within the batch, so the batch commits
/// against an empty store.
pub fn server_tagged_batch_strategy(
    client_id: String,
    max_len: usize,
) -> impl Strategy<Value = Vec<SyncEntity>> {
    prop::collection::btree_set(
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
        1..max_len.max(2),
    )
    .prop_map(move |names: BTreeSet<String>| {
        names
            .into_iter()
            .map(|name| {
                SyncEntity::new(client_id.clone(), format!("id-{name}"))
                    .with_version(1)
                    .with_server_tag(format!("google_chrome_{name}"))
                    .with_folder(true)
            })
            .collect()
    })
}

/// An operation against a single client's entities.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Insert an entity
    Insert {
        /// Entity id
        id: String,
        /// Client tag
        tag: Option<String>,
    },
    /// Update an entity at the version the caller believes is current
    Update {
        /// Entity id
        id: String,
        /// Expected version
        expected_version: i64,
    },
    /// Tombstone an entity, releasing its client tag
    Tombstone {
        /// Entity id
        id: String,
        /// Expected version
        expected_version: i64,
    },
}

fn small_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("e[0-4]").expect("Invalid regex")
}

/// Strategy for generating store operations over a small id space.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        3 => (small_id_strategy(), prop::option::of(tag_strategy()))
            .prop_map(|(id, tag)| StoreOperation::Insert { id, tag }),
        2 => (small_id_strategy(), 0i64..4)
            .prop_map(|(id, expected_version)| StoreOperation::Update { id, expected_version }),
        1 => (small_id_strategy(), 0i64..4)
            .prop_map(|(id, expected_version)| StoreOperation::Tombstone { id, expected_version }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
