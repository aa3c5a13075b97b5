//! Table layout for `sync_entities`.
//!
//! Entities and shadow tag rows share one table keyed by `(client_id, id)`.
//! The partial unique index guards client-defined tags on main rows; the
//! primary key on `Client#`/`Server#` shadow rows guards both tag kinds.

use rusqlite::Connection;

/// Name of the only table.
pub const TABLE: &str = "sync_entities";

/// Name of the partial unique index on client-defined tags.
pub const CLIENT_TAG_INDEX: &str = "sync_entities_client_tag_idx";

/// Column list in the order [`SyncEntity::from_row`](crate::SyncEntity::from_row) reads it.
pub const COLUMNS: &str = "client_id, id, parent_id, version, mtime, ctime, name, \
     non_unique_name, server_defined_unique_tag, deleted, originator_cache_guid, \
     originator_client_item_id, specifics, data_type, folder, client_defined_unique_tag, \
     unique_position, data_type_mtime, expiration_time";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS sync_entities (
    client_id TEXT NOT NULL,
    id TEXT NOT NULL,
    parent_id TEXT,
    version INTEGER,
    mtime INTEGER,
    ctime INTEGER,
    name TEXT,
    non_unique_name TEXT,
    server_defined_unique_tag TEXT,
    deleted BOOLEAN,
    originator_cache_guid TEXT,
    originator_client_item_id TEXT,
    specifics BLOB,
    data_type INTEGER,
    folder BOOLEAN,
    client_defined_unique_tag TEXT,
    unique_position BLOB,
    data_type_mtime TEXT,
    expiration_time INTEGER,
    PRIMARY KEY (client_id, id)
)";

const CREATE_CLIENT_TAG_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     sync_entities_client_tag_idx ON sync_entities (client_id, client_defined_unique_tag) \
     WHERE client_defined_unique_tag IS NOT NULL";

/// Creates the table and index if they are missing.
pub(crate) fn create(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(CREATE_TABLE, [])?;
    conn.execute(CREATE_CLIENT_TAG_INDEX, [])?;
    Ok(())
}

/// Drops the index and table if present.
pub(crate) fn drop_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DROP INDEX IF EXISTS sync_entities_client_tag_idx", [])?;
    conn.execute("DROP TABLE IF EXISTS sync_entities", [])?;
    Ok(())
}

/// Returns the stored DDL for the table and its index, sorted by name.
pub(crate) fn definitions(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT sql FROM sqlite_master
         WHERE tbl_name = ?1 AND sql IS NOT NULL
         ORDER BY name",
    )?;
    let rows = stmt.query_map([TABLE], |row| row.get(0))?;
    rows.collect()
}
