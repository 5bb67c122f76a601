//! Database query implementations.
//!
//! Every write here is idempotent: re-applying the same upstream facts leaves
//! the store unchanged.

pub mod aliases;
pub mod languages;
pub mod parents;
pub mod paths;
pub mod regions;
pub mod relations;
pub mod sources;
pub mod stats;

use rusqlite::{params, Connection, OptionalExtension};

use crate::connection::DbResult;

/// The two hierarchical entity kinds and the tables that hang off them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Region,
    Language,
}

impl EntityKind {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Language => "language",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Language => "language_entity",
        }
    }

    pub(crate) fn source_table(&self) -> &'static str {
        match self {
            Self::Region => "region_source",
            Self::Language => "language_entity_source",
        }
    }

    pub(crate) fn alias_table(&self) -> &'static str {
        match self {
            Self::Region => "region_alias",
            Self::Language => "language_entity_alias",
        }
    }

    /// Foreign key column used by the satellite tables.
    pub(crate) fn owner_column(&self) -> &'static str {
        match self {
            Self::Region => "region_id",
            Self::Language => "language_entity_id",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an entity row exists.
pub fn exists(conn: &Connection, kind: EntityKind, id: &str) -> DbResult<bool> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", kind.table()),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All entity ids of a kind, sorted.
pub fn list_ids(conn: &Connection, kind: EntityKind) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("SELECT id FROM {} ORDER BY id", kind.table()))?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
}

/// Name of an entity as currently stored.
pub fn current_name(conn: &Connection, kind: EntityKind, id: &str) -> DbResult<Option<String>> {
    conn.query_row(
        &format!("SELECT name FROM {} WHERE id = ?1", kind.table()),
        params![id],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}
