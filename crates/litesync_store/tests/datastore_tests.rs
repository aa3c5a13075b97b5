//! Integration tests for the read paths and the engine-facing trait.

use litesync_store::{ConflictKind, Datastore, JournalMode, StoreConfig, SyncEntity, SyncStore};
use litesync_testkit::prelude::*;
use std::sync::Arc;
use std::thread;

const BOOKMARKS: i64 = 32904;

fn bookmark(client_id: &str, id: &str, mtime: i64) -> SyncEntity {
    SyncEntity::new(client_id, id)
        .with_version(1)
        .with_times(mtime, mtime)
        .with_data_type(BOOKMARKS)
        .with_folder(false)
}

#[test]
fn updates_are_paged_in_mtime_order() {
    with_temp_store(|store| {
        for (id, mtime) in [("c", 300), ("a", 100), ("b", 200), ("d", 400)] {
            store.insert_sync_entity(&bookmark("c1", id, mtime)).unwrap();
        }

        let page = store.get_updates_for_type(BOOKMARKS, 0, true, "c1", 2).unwrap();
        let ids: Vec<_> = page.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert!(page.has_changes_remaining);

        let token = page.entities.last().and_then(|e| e.mtime).unwrap();
        let page = store
            .get_updates_for_type(BOOKMARKS, token, true, "c1", 2)
            .unwrap();
        let ids: Vec<_> = page.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c", "d"]);
        assert!(!page.has_changes_remaining);
    });
}

#[test]
fn updates_filter_type_client_and_folders() {
    with_temp_store(|store| {
        store.insert_sync_entity(&bookmark("c1", "item", 10)).unwrap();
        store
            .insert_sync_entity(&bookmark("c1", "folder", 11).with_folder(true))
            .unwrap();
        store
            .insert_sync_entity(&bookmark("c1", "pref", 12).with_data_type(37702))
            .unwrap();
        store.insert_sync_entity(&bookmark("c2", "theirs", 13)).unwrap();

        let without = store.get_updates_for_type(BOOKMARKS, 0, false, "c1", 10).unwrap();
        assert_eq!(without.entities.len(), 1);
        assert_eq!(without.entities[0].id, "item");

        let with = store.get_updates_for_type(BOOKMARKS, 0, true, "c1", 10).unwrap();
        assert_eq!(with.entities.len(), 2);
        assert!(!with.has_changes_remaining);
    });
}

#[test]
fn updates_include_tombstones_but_not_shadow_rows() {
    with_temp_store(|store| {
        let entity = bookmark("c1", "e1", 10).with_client_tag("t1");
        store.insert_sync_entity(&entity).unwrap();
        let tombstone = entity.clone().with_version(2).with_times(20, 10).with_deleted(true);
        store.update_sync_entity(&tombstone, 1).unwrap().applied().unwrap();

        let page = store.get_updates_for_type(BOOKMARKS, 0, true, "c1", 10).unwrap();
        assert_eq!(page.entities.len(), 1);
        assert!(page.entities[0].is_deleted());
        assert_eq!(page.entities[0].mtime, Some(20));
    });
}

#[test]
fn zero_page_reports_remaining() {
    with_temp_store(|store| {
        store.insert_sync_entity(&bookmark("c1", "e1", 10)).unwrap();
        let page = store.get_updates_for_type(BOOKMARKS, 0, true, "c1", 0).unwrap();
        assert!(page.entities.is_empty());
        assert!(page.has_changes_remaining);
    });
}

#[test]
fn clear_server_data_tombstones_everything() {
    with_temp_store(|store| {
        store
            .insert_sync_entity(&bookmark("c1", "e1", 10).with_client_tag("t1"))
            .unwrap();
        store
            .insert_sync_entities_with_server_tags(&[bookmark("c1", "root", 10)
                .with_folder(true)
                .with_server_tag("bookmark_bar")])
            .unwrap();
        store.insert_sync_entity(&bookmark("c2", "e1", 10)).unwrap();

        let cleared = store.clear_server_data("c1").unwrap();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|e| e.is_deleted() && e.version == Some(2)));
        assert!(cleared.iter().all(|e| e.client_defined_unique_tag.is_none()));

        assert_eq!(store.get_client_item_count("c1").unwrap(), 2);
        assert!(!store.has_server_defined_unique_tag("c1", "bookmark_bar").unwrap());
        assert_eq!(store.get_client_item_count("c2").unwrap(), 1);

        let stored = store.get_sync_entity("c1", "e1").unwrap().unwrap();
        assert_eq!(Some(&stored), cleared.iter().find(|e| e.id == "e1"));

        // Tags are free again.
        assert!(store
            .insert_sync_entity(&bookmark("c1", "e2", 30).with_client_tag("t1"))
            .unwrap()
            .is_applied());

        // Clearing twice finds nothing live.
        let again = store.clear_server_data("c1").unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, "e2");
    });
}

#[test]
fn datastore_trait_object_drives_the_store() {
    let store: Arc<dyn Datastore> = Arc::new(TestStore::memory().store.clone());

    let batch = [bookmark("c1", "root", 1).with_server_tag("bookmark_bar")];
    assert!(store.insert_sync_entities_with_server_tags(&batch).unwrap().is_applied());
    assert!(store.has_server_defined_unique_tag("c1", "bookmark_bar").unwrap());

    let edit = bookmark("c1", "root", 2).with_version(2);
    let updated = store.update_sync_entity(&edit, 1).unwrap().applied().unwrap();
    assert_eq!(updated.version, 2);

    let page = store.get_updates_for_type(BOOKMARKS, 1, true, "c1", 10).unwrap();
    assert_eq!(page.entities.len(), 1);
    assert_eq!(store.clear_server_data("c1").unwrap().len(), 1);
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("litesync.sqlite");
    let config = StoreConfig::new(&path);

    {
        let store = SyncStore::open(&config).unwrap();
        store
            .insert_sync_entity(&sample_entity("c1", "e1").with_client_tag("t1"))
            .unwrap();
    }

    let store = SyncStore::open(&config).unwrap();
    assert_eq!(store.get_client_item_count("c1").unwrap(), 2);
    let rival = sample_entity("c1", "e2").with_client_tag("t1");
    assert!(store.insert_sync_entity(&rival).unwrap().is_conflict());
}

#[test]
fn open_without_create_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("absent.sqlite")).create_if_missing(false);
    let err = SyncStore::open(&config).unwrap_err();
    assert!(err.is_caller_error());
    assert!(!dir.path().join("absent.sqlite").exists());
}

#[test]
fn two_connections_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("shared.sqlite")).journal_mode(JournalMode::Wal);
    let writer = SyncStore::open(&config).unwrap();
    let other = SyncStore::open(&config).unwrap();

    let tagged = sample_entity("c1", "e1").with_client_tag("t1");
    assert!(writer.insert_sync_entity(&tagged).unwrap().is_applied());

    let rival = sample_entity("c1", "e2").with_client_tag("t1");
    assert!(other.insert_sync_entity(&rival).unwrap().is_conflict());
    assert_eq!(other.get_client_item_count("c1").unwrap(), 2);
}

#[test]
fn concurrent_writers_keep_tag_unique() {
    let store = TestStore::memory();
    let result = race_client_tag(&store, "c1", "bookmark-bar", 8);
    assert_eq!(result.applied, 1);
    assert_eq!(result.errors, 0);

    let holders: Vec<_> = store
        .scan_sync_entities()
        .unwrap()
        .into_iter()
        .filter(|e| e.client_defined_unique_tag.as_deref() == Some("bookmark-bar"))
        .collect();
    assert_eq!(holders.len(), 1);
    assert_eq!(store.get_client_item_count("c1").unwrap(), 2);
}

#[test]
fn connections_racing_one_server_tag_commit_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path().join("race.sqlite")).journal_mode(JournalMode::Wal);
    let stores = [SyncStore::open(&config).unwrap(), SyncStore::open(&config).unwrap()];

    let result = race_server_tag(&stores, "c1", "bookmark_bar", 8);
    assert_eq!(result.applied, 1);
    assert_eq!(result.errors, 0);
    assert_eq!(result.conflict_kinds, vec![ConflictKind::ServerTag; 7]);

    // Only the winning batch persisted, seen from either connection.
    for store in &stores {
        assert_eq!(store.get_client_item_count("c1").unwrap(), 3);
        assert!(store.has_server_defined_unique_tag("c1", "bookmark_bar").unwrap());
    }
    let entities = stores[1].scan_sync_entities().unwrap();
    assert_eq!(entities.len(), 2);
    let root = entities
        .iter()
        .find(|e| e.server_defined_unique_tag.as_deref() == Some("bookmark_bar"))
        .unwrap();
    let child = entities.iter().find(|e| e.id != root.id).unwrap();
    assert_eq!(child.id, format!("{}-child", root.id));
}

#[test]
fn threads_with_distinct_clients_do_not_interfere() {
    let store = TestStore::memory();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = store.store.clone();
            thread::spawn(move || {
                let client_id = format!("client{t}");
                let batch = [sample_entity(&client_id, "root").with_server_tag("bookmark_bar")];
                store.insert_sync_entities_with_server_tags(&batch).unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().is_applied());
    }
    assert_eq!(store.stats().unwrap().clients, 4);
}
