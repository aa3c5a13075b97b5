//! The sync entity store.

use crate::config::StoreConfig;
use crate::conflict::{OnConflict, Violation};
use crate::entity::SyncEntity;
use crate::error::StoreResult;
use crate::schema::{self, COLUMNS};
use crate::tags::{self, TagItem, TagKind, IS_ENTITY};
use crate::txn::{self, Abort, TxnResult};
use crate::types::{now_millis, ConflictKind, StoreStats, UpdateBatch, Updated, WriteOutcome};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior};
use std::sync::Arc;
use tracing::{debug, trace, warn};

const INSERT_ENTITY: &str = "INSERT INTO sync_entities (
        client_id, id, parent_id, version, mtime, ctime, name, non_unique_name,
        server_defined_unique_tag, deleted, originator_cache_guid, originator_client_item_id,
        specifics, data_type, folder, client_defined_unique_tag, unique_position,
        data_type_mtime, expiration_time
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

// ?10 is the tombstone flag: a tombstone clears whatever client tag the row holds.
const UPDATE_ENTITY: &str = "UPDATE sync_entities SET
        parent_id = ?1,
        version = ?2,
        mtime = ?3,
        name = ?4,
        non_unique_name = ?5,
        deleted = ?6,
        specifics = ?7,
        folder = ?8,
        unique_position = ?9,
        client_defined_unique_tag = CASE
            WHEN ?10 = 1 THEN NULL
            ELSE client_defined_unique_tag
        END,
        data_type_mtime = ?11,
        expiration_time = ?12
    WHERE client_id = ?13 AND id = ?14 AND version = ?15";

/// SQLite-backed store for sync entities.
///
/// `SyncStore` owns nothing global: the connection is injected at
/// construction and shared by clones of the store. Every operation runs in
/// its own transaction on that connection, and callers on different threads
/// are serialized by the connection lock.
///
/// # Example
///
/// ```rust
/// use litesync_store::{SyncEntity, SyncStore};
///
/// let store = SyncStore::open_in_memory().unwrap();
/// store.create_schema().unwrap();
///
/// let entity = SyncEntity::new("client1", "id1").with_version(1);
/// assert!(store.insert_sync_entity(&entity).unwrap().is_applied());
/// assert!(store.insert_sync_entity(&entity).unwrap().is_conflict());
/// assert_eq!(store.get_client_item_count("client1").unwrap(), 1);
/// ```
#[derive(Clone)]
pub struct SyncStore {
    conn: Arc<Mutex<Connection>>,
}

impl SyncStore {
    /// Creates a store over an already opened connection.
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    /// Creates a store over a connection shared with other components.
    pub fn from_shared(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Opens a store as described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            let mut flags = OpenFlags::default();
            if config.create_if_missing {
                if let Some(parent) = config.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            } else {
                flags.remove(OpenFlags::SQLITE_OPEN_CREATE);
            }
            Connection::open_with_flags(&config.path, flags)?
        };
        config.configure(&conn)?;

        let store = Self::new(conn);
        if config.create_schema {
            store.create_schema()?;
        }
        debug!(path = %config.path.display(), "sync store opened");
        Ok(store)
    }

    /// Opens a private in-memory store. The schema is not created.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::in_memory().create_schema(false))
    }

    /// Returns the shared connection.
    pub fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Runs `f` in an immediate (write-locked) transaction.
    ///
    /// `f` commits by returning `Ok`. Returning [`Abort::Conflict`] rolls
    /// back and yields [`WriteOutcome::Conflict`]; any other error rolls
    /// back and is returned.
    pub fn transaction<T, F>(&self, f: F) -> StoreResult<WriteOutcome<T>>
    where
        F: FnOnce(&Transaction<'_>) -> TxnResult<T>,
    {
        txn::run(&self.conn, TransactionBehavior::Immediate, f)
    }

    /// Creates the table and the client tag index if absent.
    pub fn create_schema(&self) -> StoreResult<()> {
        self.infallible(|tx| {
            schema::create(tx)?;
            Ok(())
        })
    }

    /// Drops the table and index.
    pub fn drop_schema(&self) -> StoreResult<()> {
        self.infallible(|tx| {
            schema::drop_tables(tx)?;
            Ok(())
        })
    }

    /// Drops and recreates the schema, discarding all rows.
    pub fn reset_schema(&self) -> StoreResult<()> {
        self.infallible(|tx| {
            schema::drop_tables(tx)?;
            schema::create(tx)?;
            Ok(())
        })
    }

    /// Returns the stored DDL of the table and index.
    pub fn schema_definitions(&self) -> StoreResult<Vec<String>> {
        txn::read(&self.conn, |tx| schema::definitions(tx))
    }

    /// Inserts one entity, reserving its client tag if it has one.
    ///
    /// The entity row and the `Client#` shadow row commit together or not at
    /// all. A duplicate `(client_id, id)` yields
    /// `Conflict(ConflictKind::PrimaryKey)`; a client tag already held by a
    /// live entity of the same client yields `Conflict(ConflictKind::ClientTag)`.
    pub fn insert_sync_entity(&self, entity: &SyncEntity) -> StoreResult<WriteOutcome> {
        entity.validate()?;

        let outcome = self.transaction(|tx| {
            insert_entity(tx, entity)?;
            if let Some(tag) = entity.client_defined_unique_tag.as_deref() {
                tags::insert_tag(tx, TagKind::Client, &entity.client_id, tag, now_millis())?;
            }
            Ok(())
        })?;

        if let WriteOutcome::Conflict(kind) = outcome {
            debug!(client_id = %entity.client_id, id = %entity.id, %kind, "insert conflicted");
        }
        Ok(outcome)
    }

    /// Inserts a batch of entities, reserving their server tags.
    ///
    /// The batch is one transaction processed in order. The first entity
    /// whose server tag is already reserved, or any other uniqueness
    /// collision, rolls back the whole batch: either every entity persists or
    /// none does.
    pub fn insert_sync_entities_with_server_tags(
        &self,
        entities: &[SyncEntity],
    ) -> StoreResult<WriteOutcome> {
        for entity in entities {
            entity.validate()?;
        }
        if entities.is_empty() {
            return Ok(WriteOutcome::Applied(()));
        }

        let outcome = self.transaction(|tx| {
            let now = now_millis();
            for entity in entities {
                if let Some(tag) = entity.server_defined_unique_tag.as_deref() {
                    // Early exit only; the shadow row's primary key below is
                    // what rejects a concurrent duplicate.
                    if tags::tag_exists(tx, TagKind::Server, &entity.client_id, tag)? {
                        debug!(client_id = %entity.client_id, tag, "server tag already reserved");
                        return Err(Abort::conflict(ConflictKind::ServerTag));
                    }
                }

                insert_entity(tx, entity)?;
                if let Some(tag) = entity.server_defined_unique_tag.as_deref() {
                    tags::insert_tag(tx, TagKind::Server, &entity.client_id, tag, now)?;
                }
                if let Some(tag) = entity.client_defined_unique_tag.as_deref() {
                    tags::insert_tag(tx, TagKind::Client, &entity.client_id, tag, now)?;
                }
            }
            Ok(())
        })?;

        match outcome {
            WriteOutcome::Applied(()) => {
                trace!(count = entities.len(), "server-tagged batch committed");
            }
            WriteOutcome::Conflict(kind) => {
                debug!(count = entities.len(), %kind, "server-tagged batch rolled back");
            }
        }
        Ok(outcome)
    }

    /// Updates an entity if its stored version equals `expected_version`.
    ///
    /// The stored version becomes `entity.version` when that is greater than
    /// `expected_version`, and `expected_version + 1` otherwise.
    ///
    /// A version mismatch (including a missing row) yields
    /// `Conflict(ConflictKind::Version)` and changes nothing. Tombstoning an
    /// entity that holds a client tag releases the tag in the same
    /// transaction and reports `tag_released`. The released tag is the one
    /// stored on the row; the tag named by `entity` is ignored, since it
    /// may already belong to another entity of the client.
    pub fn update_sync_entity(
        &self,
        entity: &SyncEntity,
        expected_version: i64,
    ) -> StoreResult<WriteOutcome<Updated>> {
        entity.validate()?;

        let version = entity
            .version
            .filter(|v| *v > expected_version)
            .unwrap_or(expected_version.saturating_add(1));
        let tombstone = entity.is_deleted();

        let outcome = self.transaction(|tx| {
            let held_tag: Option<String> = match tx
                .query_row(
                    "SELECT client_defined_unique_tag FROM sync_entities
                     WHERE client_id = ?1 AND id = ?2 AND version = ?3",
                    params![entity.client_id, entity.id, expected_version],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(tag) => tag,
                None => return Err(Abort::conflict(ConflictKind::Version)),
            };

            let changed = tx
                .execute(
                    UPDATE_ENTITY,
                    params![
                        entity.parent_id,
                        version,
                        entity.mtime,
                        entity.name,
                        entity.non_unique_name,
                        entity.deleted,
                        entity.specifics,
                        entity.folder,
                        entity.unique_position,
                        tombstone,
                        entity.data_type_mtime,
                        entity.expiration_time,
                        entity.client_id,
                        entity.id,
                        expected_version,
                    ],
                )
                .on_conflict(entity_conflict)?;
            if changed == 0 {
                return Err(Abort::conflict(ConflictKind::Version));
            }

            let tag_released = match held_tag.as_deref().filter(|_| tombstone) {
                Some(tag) => {
                    let removed = tags::delete_tag(tx, TagKind::Client, &entity.client_id, tag)?;
                    if !removed {
                        debug!(client_id = %entity.client_id, tag, "tombstoned tag had no shadow row");
                    }
                    removed
                }
                None => false,
            };
            Ok(Updated {
                version,
                tag_released,
            })
        })?;

        if outcome.is_conflict() {
            debug!(
                client_id = %entity.client_id,
                id = %entity.id,
                expected_version,
                "update conflicted"
            );
        }
        Ok(outcome)
    }

    /// Counts all rows of a client, shadow rows included.
    pub fn get_client_item_count(&self, client_id: &str) -> StoreResult<usize> {
        txn::read(&self.conn, |tx| {
            tx.query_row(
                "SELECT COUNT(*) FROM sync_entities WHERE client_id = ?1",
                [client_id],
                |row| row.get(0),
            )
        })
    }

    /// Returns true if `tag` is reserved as a server tag of `client_id`.
    pub fn has_server_defined_unique_tag(&self, client_id: &str, tag: &str) -> StoreResult<bool> {
        txn::read(&self.conn, |tx| {
            tags::tag_exists(tx, TagKind::Server, client_id, tag)
        })
    }

    /// Returns entities of `data_type` modified after `client_token`.
    ///
    /// Entities come back in modification order, at most `max_size` of them.
    /// Folders are skipped unless `fetch_folders` is set. Tombstones are
    /// included so clients learn about deletions.
    pub fn get_updates_for_type(
        &self,
        data_type: i64,
        client_token: i64,
        fetch_folders: bool,
        client_id: &str,
        max_size: usize,
    ) -> StoreResult<UpdateBatch> {
        let limit = i64::try_from(max_size)
            .unwrap_or(i64::MAX)
            .saturating_add(1);
        let mut entities = txn::read(&self.conn, |tx| {
            let mut stmt = tx.prepare(&format!(
                "SELECT {COLUMNS} FROM sync_entities
                 WHERE client_id = ?1 AND data_type = ?2 AND mtime > ?3
                   AND (?4 OR folder IS NULL OR folder = 0)
                 ORDER BY mtime, id
                 LIMIT ?5"
            ))?;
            let rows = stmt.query_map(
                params![client_id, data_type, client_token, fetch_folders, limit],
                SyncEntity::from_row,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let has_changes_remaining = entities.len() > max_size;
        entities.truncate(max_size);
        Ok(UpdateBatch {
            entities,
            has_changes_remaining,
        })
    }

    /// Accepts a client item count from the protocol layer.
    ///
    /// Counts are derived from the table by [`get_client_item_count`](Self::get_client_item_count),
    /// so nothing is stored.
    pub fn update_client_item_count(&self, client_id: &str, count: usize) -> StoreResult<()> {
        trace!(client_id, count, "item count is derived; nothing to store");
        Ok(())
    }

    /// Tombstones every live entity of a client and releases all its tags.
    ///
    /// Each tombstone gets a bumped version and the current time as `mtime`.
    /// Returns the entities as they are stored afterwards.
    pub fn clear_server_data(&self, client_id: &str) -> StoreResult<Vec<SyncEntity>> {
        let outcome = self.transaction(|tx| {
            let now = now_millis();
            let mut live = select_entities(
                tx,
                &format!(
                    "WHERE client_id = ?1 AND {IS_ENTITY} AND (deleted IS NULL OR deleted = 0)"
                ),
                [client_id],
            )?;

            tx.execute(
                &format!(
                    "UPDATE sync_entities SET
                        deleted = 1,
                        mtime = ?2,
                        version = CASE
                            WHEN version >= ?3 THEN version
                            ELSE COALESCE(version, 0) + 1
                        END,
                        client_defined_unique_tag = NULL
                     WHERE client_id = ?1 AND {IS_ENTITY} AND (deleted IS NULL OR deleted = 0)"
                ),
                params![client_id, now, i64::MAX],
            )?;
            let released = tags::delete_all_tags(tx, client_id)?;
            debug!(client_id, tombstoned = live.len(), released, "server data cleared");

            for entity in &mut live {
                entity.deleted = Some(true);
                entity.mtime = Some(now);
                entity.version = Some(entity.version.unwrap_or(0).saturating_add(1));
                entity.client_defined_unique_tag = None;
            }
            Ok(live)
        })?;
        Ok(outcome.applied().unwrap_or_default())
    }

    /// Accepts a request to disable a client's sync chain.
    ///
    /// Chain state is kept by the sync engine, not in this table.
    pub fn disable_sync_chain(&self, client_id: &str) -> StoreResult<()> {
        warn!(client_id, "sync chain disabling is not persisted by this store");
        Ok(())
    }

    /// Reports whether a client's sync chain is disabled. Always false.
    pub fn is_sync_chain_disabled(&self, _client_id: &str) -> StoreResult<bool> {
        Ok(false)
    }

    /// Reads one entity by key. Shadow rows are never returned.
    pub fn get_sync_entity(&self, client_id: &str, id: &str) -> StoreResult<Option<SyncEntity>> {
        if tags::is_shadow_id(id) {
            return Ok(None);
        }
        txn::read(&self.conn, |tx| {
            tx.query_row(
                &format!("SELECT {COLUMNS} FROM sync_entities WHERE client_id = ?1 AND id = ?2"),
                [client_id, id],
                SyncEntity::from_row,
            )
            .optional()
        })
    }

    /// Lists every main entity row, tombstones included.
    pub fn scan_sync_entities(&self) -> StoreResult<Vec<SyncEntity>> {
        txn::read(&self.conn, |tx| {
            select_entities(tx, &format!("WHERE {IS_ENTITY}"), [])
        })
    }

    /// Lists every shadow tag row.
    pub fn scan_tag_items(&self) -> StoreResult<Vec<TagItem>> {
        txn::read(&self.conn, |tx| tags::scan(tx))
    }

    /// Returns row totals for the whole table.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        txn::read(&self.conn, |tx| {
            tx.query_row(
                &format!(
                    "SELECT
                        COUNT(*),
                        COUNT(DISTINCT client_id),
                        COALESCE(SUM({IS_ENTITY}), 0),
                        COALESCE(SUM({IS_ENTITY} AND deleted = 1), 0),
                        COALESCE(SUM({client}), 0),
                        COALESCE(SUM({server}), 0)
                     FROM sync_entities",
                    client = tags::id_has_prefix(TagKind::Client),
                    server = tags::id_has_prefix(TagKind::Server),
                ),
                [],
                |row| {
                    Ok(StoreStats {
                        rows: row.get(0)?,
                        clients: row.get(1)?,
                        entities: row.get(2)?,
                        tombstones: row.get(3)?,
                        client_tags: row.get(4)?,
                        server_tags: row.get(5)?,
                    })
                },
            )
        })
    }

    /// Runs a unit of work that cannot conflict.
    fn infallible<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&Transaction<'_>) -> TxnResult<()>,
    {
        // Schema statements raise no uniqueness violations, so a conflict
        // outcome cannot occur here.
        let _ = self.transaction(f)?;
        Ok(())
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore").finish_non_exhaustive()
    }
}

/// Maps a uniqueness violation on a main entity row.
fn entity_conflict(violation: Violation) -> ConflictKind {
    match violation {
        Violation::PrimaryKey => ConflictKind::PrimaryKey,
        Violation::Unique => ConflictKind::ClientTag,
    }
}

fn insert_entity(conn: &Connection, entity: &SyncEntity) -> TxnResult<()> {
    conn.execute(
        INSERT_ENTITY,
        params![
            entity.client_id,
            entity.id,
            entity.parent_id,
            entity.version,
            entity.mtime,
            entity.ctime,
            entity.name,
            entity.non_unique_name,
            entity.server_defined_unique_tag,
            entity.deleted,
            entity.originator_cache_guid,
            entity.originator_client_item_id,
            entity.specifics,
            entity.data_type,
            entity.folder,
            entity.client_defined_unique_tag,
            entity.unique_position,
            entity.data_type_mtime,
            entity.expiration_time,
        ],
    )
    .on_conflict(entity_conflict)?;
    Ok(())
}

fn select_entities<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> rusqlite::Result<Vec<SyncEntity>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM sync_entities {filter} ORDER BY client_id, id"
    ))?;
    let rows = stmt.query_map(params, SyncEntity::from_row)?;
    rows.collect()
}
