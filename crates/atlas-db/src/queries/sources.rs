//! Provenance records. Append-only: the first write for a
//! (entity, source, external id) triple wins.

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::EntityKind;
use crate::connection::{DbError, DbResult};

/// Source name used for Wikidata provenance.
pub const WIKIDATA_SOURCE: &str = "wikidata";

/// One provenance fact to record.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub source: String,
    pub external_id: String,
    pub version: Option<String>,
    pub url: Option<String>,
    pub data: serde_json::Value,
}

impl SourceRecord {
    pub fn new(source: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            external_id: external_id.into(),
            version: None,
            url: None,
            data: serde_json::Value::Object(Default::default()),
        }
    }

    /// Provenance pointing at a Wikidata item page.
    pub fn wikidata(qid: &str) -> Self {
        Self::new(WIKIDATA_SOURCE, qid).with_url(format!("https://www.wikidata.org/wiki/{}", qid))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Record provenance for an entity; returns whether a row was inserted.
pub fn add_source(
    conn: &Connection,
    kind: EntityKind,
    entity_id: &str,
    record: &SourceRecord,
) -> DbResult<bool> {
    let data = serde_json::to_string(&record.data)?;
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {table} (id, {owner}, source, external_id, version, url, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT ({owner}, source, external_id) DO NOTHING",
            table = kind.source_table(),
            owner = kind.owner_column(),
        ),
        params![
            Uuid::new_v4().to_string(),
            entity_id,
            record.source,
            record.external_id,
            record.version,
            record.url,
            data,
        ],
    )?;
    Ok(inserted > 0)
}

/// Provenance of an entity, ordered by source then external id.
pub fn list_sources(conn: &Connection, kind: EntityKind, entity_id: &str) -> DbResult<Vec<SourceRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT source, external_id, version, url, data FROM {table}
         WHERE {owner} = ?1 ORDER BY source, external_id",
        table = kind.source_table(),
        owner = kind.owner_column(),
    ))?;
    let rows = stmt.query_map(params![entity_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (source, external_id, version, url, data) = row?;
        records.push(SourceRecord {
            source,
            external_id,
            version,
            url,
            data: serde_json::from_str(&data).map_err(DbError::from)?,
        });
    }
    Ok(records)
}
