//! Property tests: the store against a plain in-memory model.

use litesync_store::{ConflictKind, SyncEntity};
use litesync_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;

const CLIENT: &str = "c1";

#[derive(Debug, Clone)]
struct ModelRow {
    version: i64,
    tag: Option<String>,
    deleted: bool,
}

/// Reference behavior for one client.
#[derive(Debug, Default)]
struct Model {
    rows: HashMap<String, ModelRow>,
}

impl Model {
    fn tag_holder(&self, tag: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(_, row)| row.tag.as_deref() == Some(tag))
            .map(|(id, _)| id.as_str())
    }

    fn item_count(&self) -> usize {
        self.rows.len() + self.rows.values().filter(|r| r.tag.is_some()).count()
    }
}

fn entity(id: &str, version: i64, tag: Option<&str>) -> SyncEntity {
    let mut entity = sample_entity(CLIENT, id).with_version(version);
    entity.client_defined_unique_tag = tag.map(str::to_owned);
    entity
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn store_matches_model(ops in operation_sequence_strategy(1, 40)) {
        let store = TestStore::memory();
        let mut model = Model::default();

        for op in ops {
            match op {
                StoreOperation::Insert { id, tag } => {
                    let outcome = store.insert_sync_entity(&entity(&id, 1, tag.as_deref())).unwrap();
                    let key_taken = model.rows.contains_key(&id);
                    let tag_taken = tag.as_deref().is_some_and(|t| model.tag_holder(t).is_some());
                    match outcome.conflict() {
                        None => prop_assert!(!key_taken && !tag_taken),
                        // SQLite picks which violated constraint to report.
                        Some(ConflictKind::PrimaryKey) => prop_assert!(key_taken),
                        Some(ConflictKind::ClientTag) => prop_assert!(tag_taken),
                        Some(other) => prop_assert!(false, "unexpected conflict {}", other),
                    }
                    if !key_taken && !tag_taken {
                        model.rows.insert(id, ModelRow { version: 1, tag, deleted: false });
                    }
                }
                StoreOperation::Update { id, expected_version } => {
                    let tag = model.rows.get(&id).and_then(|r| r.tag.clone());
                    let edit = entity(&id, expected_version + 1, tag.as_deref());
                    let outcome = store.update_sync_entity(&edit, expected_version).unwrap();
                    match model.rows.get_mut(&id) {
                        Some(row) if row.version == expected_version => {
                            let updated = outcome.applied().unwrap();
                            prop_assert_eq!(updated.version, expected_version + 1);
                            prop_assert!(!updated.tag_released);
                            row.version = updated.version;
                            // Updates write the deleted flag, so a live edit revives a tombstone.
                            row.deleted = false;
                        }
                        _ => {
                            prop_assert_eq!(outcome.conflict(), Some(ConflictKind::Version));
                        }
                    }
                }
                StoreOperation::Tombstone { id, expected_version } => {
                    let tag = model.rows.get(&id).and_then(|r| r.tag.clone());
                    let tombstone = entity(&id, expected_version + 1, tag.as_deref()).with_deleted(true);
                    let outcome = store.update_sync_entity(&tombstone, expected_version).unwrap();
                    match model.rows.get_mut(&id) {
                        Some(row) if row.version == expected_version => {
                            let updated = outcome.applied().unwrap();
                            prop_assert_eq!(updated.tag_released, row.tag.is_some());
                            row.version = updated.version;
                            row.tag = None;
                            row.deleted = true;
                        }
                        _ => {
                            prop_assert_eq!(outcome.conflict(), Some(ConflictKind::Version));
                        }
                    }
                }
            }

            prop_assert_eq!(store.get_client_item_count(CLIENT).unwrap(), model.item_count());
        }

        for (id, row) in &model.rows {
            let stored = store.get_sync_entity(CLIENT, id).unwrap().unwrap();
            prop_assert_eq!(stored.version, Some(row.version));
            prop_assert_eq!(&stored.client_defined_unique_tag, &row.tag);
            prop_assert_eq!(stored.is_deleted(), row.deleted);
        }
    }

    #[test]
    fn committed_batch_reserves_every_tag(batch in server_tagged_batch_strategy(CLIENT.into(), 8)) {
        let store = TestStore::memory();
        prop_assert!(store.insert_sync_entities_with_server_tags(&batch).unwrap().is_applied());
        prop_assert_eq!(store.get_client_item_count(CLIENT).unwrap(), batch.len() * 2);

        for entity in &batch {
            let tag = entity.server_defined_unique_tag.as_deref().unwrap();
            prop_assert!(store.has_server_defined_unique_tag(CLIENT, tag).unwrap());
        }

        // Replaying any member's tag under a fresh id aborts the whole retry.
        let mut retry = batch.clone();
        for entity in &mut retry {
            entity.id = format!("{}-retry", entity.id);
        }
        let outcome = store.insert_sync_entities_with_server_tags(&retry).unwrap();
        prop_assert_eq!(outcome.conflict(), Some(ConflictKind::ServerTag));
        prop_assert_eq!(store.get_client_item_count(CLIENT).unwrap(), batch.len() * 2);
    }
}
