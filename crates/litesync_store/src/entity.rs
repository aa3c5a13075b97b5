//! The sync entity model.

use crate::error::{StoreError, StoreResult};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// One user data item tracked by the sync protocol.
///
/// An entity is owned by `(client_id, id)`. Every other field is optional so
/// that partially populated items coming from the protocol layer can be
/// stored as-is; the store only interprets `version`, `deleted` and the two
/// unique tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntity {
    /// Owning client.
    pub client_id: String,
    /// Entity id, unique per client.
    pub id: String,
    /// Optional parent entity id. Not checked for existence.
    pub parent_id: Option<String>,
    /// Monotonic version; may be absent on first insert.
    pub version: Option<i64>,
    /// Modification time in milliseconds.
    pub mtime: Option<i64>,
    /// Creation time in milliseconds.
    pub ctime: Option<i64>,
    /// Display name.
    pub name: Option<String>,
    /// Non-unique display name.
    pub non_unique_name: Option<String>,
    /// Server-defined unique tag (permanent folders and similar).
    pub server_defined_unique_tag: Option<String>,
    /// Tombstone flag.
    pub deleted: Option<bool>,
    /// Provenance: originating cache GUID.
    pub originator_cache_guid: Option<String>,
    /// Provenance: originating client item id.
    pub originator_client_item_id: Option<String>,
    /// Opaque payload.
    pub specifics: Option<Vec<u8>>,
    /// Payload kind.
    pub data_type: Option<i64>,
    /// Structural folder flag.
    pub folder: Option<bool>,
    /// Client-defined unique tag.
    pub client_defined_unique_tag: Option<String>,
    /// Opaque ordering token.
    pub unique_position: Option<Vec<u8>>,
    /// `"<data_type>#<mtime>"` sort key.
    pub data_type_mtime: Option<String>,
    /// Expiration time in milliseconds.
    pub expiration_time: Option<i64>,
}

impl SyncEntity {
    /// Creates an entity with only its key set.
    pub fn new(client_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets the parent id.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets both timestamps.
    #[must_use]
    pub fn with_times(mut self, mtime: i64, ctime: i64) -> Self {
        self.mtime = Some(mtime);
        self.ctime = Some(ctime);
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the data type and derives `data_type_mtime` when `mtime` is known.
    #[must_use]
    pub fn with_data_type(mut self, data_type: i64) -> Self {
        self.data_type = Some(data_type);
        if let Some(mtime) = self.mtime {
            self.data_type_mtime = Some(format!("{data_type}#{mtime}"));
        }
        self
    }

    /// Sets the folder flag.
    #[must_use]
    pub fn with_folder(mut self, folder: bool) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Sets the tombstone flag.
    #[must_use]
    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_specifics(mut self, specifics: impl Into<Vec<u8>>) -> Self {
        self.specifics = Some(specifics.into());
        self
    }

    /// Sets the client-defined unique tag.
    #[must_use]
    pub fn with_client_tag(mut self, tag: impl Into<String>) -> Self {
        self.client_defined_unique_tag = Some(tag.into());
        self
    }

    /// Sets the server-defined unique tag.
    #[must_use]
    pub fn with_server_tag(mut self, tag: impl Into<String>) -> Self {
        self.server_defined_unique_tag = Some(tag.into());
        self
    }

    /// Returns true if the entity is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    /// Returns true if the entity is a folder.
    pub fn is_folder(&self) -> bool {
        self.folder.unwrap_or(false)
    }

    /// Checks the identifiers every write requires.
    ///
    /// Called before a transaction is opened so that a malformed entity
    /// never reaches the database.
    pub fn validate(&self) -> StoreResult<()> {
        if self.client_id.is_empty() {
            return Err(StoreError::invalid_entity("client_id must not be empty"));
        }
        if self.id.is_empty() {
            return Err(StoreError::invalid_entity(format!(
                "id must not be empty (client {})",
                self.client_id
            )));
        }
        if crate::tags::is_shadow_id(&self.id) {
            return Err(StoreError::invalid_entity(format!(
                "id {} uses a reserved tag prefix",
                self.id
            )));
        }
        if self.client_defined_unique_tag.as_deref() == Some("") {
            return Err(StoreError::invalid_entity(format!(
                "client tag of {} must not be empty",
                self.id
            )));
        }
        if self.server_defined_unique_tag.as_deref() == Some("") {
            return Err(StoreError::invalid_entity(format!(
                "server tag of {} must not be empty",
                self.id
            )));
        }
        Ok(())
    }

    /// Reads an entity from a row selected with [`schema::COLUMNS`](crate::schema::COLUMNS).
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            client_id: row.get(0)?,
            id: row.get(1)?,
            parent_id: row.get(2)?,
            version: row.get(3)?,
            mtime: row.get(4)?,
            ctime: row.get(5)?,
            name: row.get(6)?,
            non_unique_name: row.get(7)?,
            server_defined_unique_tag: row.get(8)?,
            deleted: row.get(9)?,
            originator_cache_guid: row.get(10)?,
            originator_client_item_id: row.get(11)?,
            specifics: row.get(12)?,
            data_type: row.get(13)?,
            folder: row.get(14)?,
            client_defined_unique_tag: row.get(15)?,
            unique_position: row.get(16)?,
            data_type_mtime: row.get(17)?,
            expiration_time: row.get(18)?,
        })
    }
}
