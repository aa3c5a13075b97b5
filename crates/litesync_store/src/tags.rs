//! Shadow tag rows.
//!
//! A unique tag is reserved by a synthetic row in `sync_entities` whose id is
//! the tag prefixed with its kind, e.g. `Client#bookmark-bar` or
//! `Server#google_chrome_bookmarks`. The table's primary key then rejects a
//! second holder of the same tag for the same client. Shadow rows carry only
//! `mtime` and `ctime`; every entity column is NULL.
//!
//! A shadow row is inserted in the same transaction as its owning entity and
//! deleted in the same transaction that tombstones it.

use crate::conflict::OnConflict;
use crate::txn::TxnResult;
use crate::types::ConflictKind;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id prefix of client-defined tag rows.
pub const CLIENT_TAG_PREFIX: &str = "Client#";

/// Id prefix of server-defined tag rows.
pub const SERVER_TAG_PREFIX: &str = "Server#";

/// SQL predicate selecting shadow rows. Both prefixes are seven bytes.
pub(crate) const IS_SHADOW: &str = "substr(id, 1, 7) IN ('Client#', 'Server#')";

/// SQL predicate selecting main entity rows.
pub(crate) const IS_ENTITY: &str = "substr(id, 1, 7) NOT IN ('Client#', 'Server#')";

/// SQL predicate selecting the shadow rows of one kind.
pub(crate) fn id_has_prefix(kind: TagKind) -> String {
    let prefix = kind.prefix();
    format!("substr(id, 1, {}) = '{prefix}'", prefix.len())
}

/// Which of the two unique tags a shadow row reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// `client_defined_unique_tag`.
    Client,
    /// `server_defined_unique_tag`.
    Server,
}

impl TagKind {
    /// Returns the id prefix for this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            TagKind::Client => CLIENT_TAG_PREFIX,
            TagKind::Server => SERVER_TAG_PREFIX,
        }
    }

    /// Builds the shadow row id for `tag`.
    pub fn shadow_id(self, tag: &str) -> String {
        format!("{}{}", self.prefix(), tag)
    }

    /// Splits a shadow row id into its kind and tag.
    pub fn parse(id: &str) -> Option<(TagKind, &str)> {
        if let Some(tag) = id.strip_prefix(CLIENT_TAG_PREFIX) {
            Some((TagKind::Client, tag))
        } else {
            id.strip_prefix(SERVER_TAG_PREFIX)
                .map(|tag| (TagKind::Server, tag))
        }
    }

    /// The conflict reported when this tag is already held.
    pub const fn conflict(self) -> ConflictKind {
        match self {
            TagKind::Client => ConflictKind::ClientTag,
            TagKind::Server => ConflictKind::ServerTag,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Client => f.write_str("client"),
            TagKind::Server => f.write_str("server"),
        }
    }
}

/// Returns true if `id` names a shadow row rather than an entity.
pub fn is_shadow_id(id: &str) -> bool {
    TagKind::parse(id).is_some()
}

/// A shadow row as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagItem {
    /// Owning client.
    pub client_id: String,
    /// Prefixed shadow id.
    pub id: String,
    /// Modification time in milliseconds.
    pub mtime: Option<i64>,
    /// Creation time in milliseconds.
    pub ctime: Option<i64>,
}

impl TagItem {
    /// Returns the tag kind, if the id carries a known prefix.
    pub fn kind(&self) -> Option<TagKind> {
        TagKind::parse(&self.id).map(|(kind, _)| kind)
    }

    /// Returns the tag without its prefix.
    pub fn tag(&self) -> Option<&str> {
        TagKind::parse(&self.id).map(|(_, tag)| tag)
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            client_id: row.get(0)?,
            id: row.get(1)?,
            mtime: row.get(2)?,
            ctime: row.get(3)?,
        })
    }
}

/// Reserves `tag` for `client_id`.
///
/// A primary key collision means the tag is taken and aborts the
/// transaction with the kind's conflict.
pub(crate) fn insert_tag(
    conn: &Connection,
    kind: TagKind,
    client_id: &str,
    tag: &str,
    now: i64,
) -> TxnResult<()> {
    conn.execute(
        "INSERT INTO sync_entities (client_id, id, mtime, ctime) VALUES (?1, ?2, ?3, ?3)",
        params![client_id, kind.shadow_id(tag), now],
    )
    .on_conflict(|_| kind.conflict())?;
    Ok(())
}

/// Returns true if `tag` is currently reserved for `client_id`.
pub(crate) fn tag_exists(
    conn: &Connection,
    kind: TagKind,
    client_id: &str,
    tag: &str,
) -> rusqlite::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sync_entities WHERE client_id = ?1 AND id = ?2",
            params![client_id, kind.shadow_id(tag)],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Releases `tag` for `client_id`. Returns true if a row was removed.
pub(crate) fn delete_tag(
    conn: &Connection,
    kind: TagKind,
    client_id: &str,
    tag: &str,
) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM sync_entities WHERE client_id = ?1 AND id = ?2",
        params![client_id, kind.shadow_id(tag)],
    )?;
    Ok(removed > 0)
}

/// Releases every tag of `client_id`. Returns the number of rows removed.
pub(crate) fn delete_all_tags(conn: &Connection, client_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("DELETE FROM sync_entities WHERE client_id = ?1 AND {IS_SHADOW}"),
        [client_id],
    )
}

/// Lists every shadow row in the table.
pub(crate) fn scan(conn: &Connection) -> rusqlite::Result<Vec<TagItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT client_id, id, mtime, ctime FROM sync_entities
         WHERE {IS_SHADOW} ORDER BY client_id, id"
    ))?;
    let rows = stmt.query_map([], TagItem::from_row)?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::Abort;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::create(&conn).unwrap();
        conn
    }

    #[test]
    fn shadow_ids() {
        assert_eq!(TagKind::Client.shadow_id("t1"), "Client#t1");
        assert_eq!(TagKind::Server.shadow_id("t1"), "Server#t1");
        assert_eq!(TagKind::parse("Server#a#b"), Some((TagKind::Server, "a#b")));
        assert_eq!(TagKind::parse("client#t1"), None);
        assert!(is_shadow_id("Client#"));
        assert!(!is_shadow_id("e1"));
    }

    #[test]
    fn predicates_follow_prefixes() {
        for kind in [TagKind::Client, TagKind::Server] {
            assert_eq!(kind.prefix().len(), 7);
            assert!(IS_SHADOW.contains(&format!("'{}'", kind.prefix())));
            assert!(IS_ENTITY.contains(&format!("'{}'", kind.prefix())));
        }
        assert_eq!(id_has_prefix(TagKind::Client), "substr(id, 1, 7) = 'Client#'");

        let conn = conn();
        insert_tag(&conn, TagKind::Client, "c1", "t1", 10).unwrap();
        insert_tag(&conn, TagKind::Server, "c1", "t2", 10).unwrap();
        insert_tag(&conn, TagKind::Server, "c1", "t3", 10).unwrap();
        let count = |kind| -> i64 {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM sync_entities WHERE {}", id_has_prefix(kind)),
                [],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(count(TagKind::Client), 1);
        assert_eq!(count(TagKind::Server), 2);
    }

    #[test]
    fn insert_then_collide() {
        let conn = conn();
        insert_tag(&conn, TagKind::Client, "c1", "t1", 10).unwrap();
        assert!(tag_exists(&conn, TagKind::Client, "c1", "t1").unwrap());
        assert!(!tag_exists(&conn, TagKind::Server, "c1", "t1").unwrap());
        assert!(!tag_exists(&conn, TagKind::Client, "c2", "t1").unwrap());

        let again = insert_tag(&conn, TagKind::Client, "c1", "t1", 11);
        assert!(matches!(
            again,
            Err(Abort::Conflict(ConflictKind::ClientTag))
        ));

        // The same value under the other kind is a different slot.
        insert_tag(&conn, TagKind::Server, "c1", "t1", 12).unwrap();
    }

    #[test]
    fn delete_releases_slot() {
        let conn = conn();
        insert_tag(&conn, TagKind::Client, "c1", "t1", 10).unwrap();
        assert!(delete_tag(&conn, TagKind::Client, "c1", "t1").unwrap());
        assert!(!delete_tag(&conn, TagKind::Client, "c1", "t1").unwrap());
        insert_tag(&conn, TagKind::Client, "c1", "t1", 20).unwrap();
    }

    #[test]
    fn scan_and_delete_all() {
        let conn = conn();
        insert_tag(&conn, TagKind::Client, "c1", "a", 1).unwrap();
        insert_tag(&conn, TagKind::Server, "c1", "b", 2).unwrap();
        insert_tag(&conn, TagKind::Client, "c2", "a", 3).unwrap();

        let items = scan(&conn).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].kind(), Some(TagKind::Client));
        assert_eq!(items[0].tag(), Some("a"));
        assert_eq!(items[0].mtime, Some(1));
        assert_eq!(items[0].ctime, Some(1));

        assert_eq!(delete_all_tags(&conn, "c1").unwrap(), 2);
        assert_eq!(scan(&conn).unwrap().len(), 1);
    }
}
