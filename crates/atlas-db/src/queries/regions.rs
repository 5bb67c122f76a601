//! Region queries: canonical upsert, defensive ensure-exists, properties.

use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::parents::{write_with_name_recovery, MergeOutcome};
use super::sources::{add_source, SourceRecord};
use super::{exists, EntityKind};
use crate::connection::{DbError, DbResult};

/// Property key for ISO 3166-1 alpha-2 codes.
pub const ISO_ALPHA2_KEY: &str = "iso_3166_1_alpha2";

/// Property key for ISO 3166-1 alpha-3 codes.
pub const ISO_ALPHA3_KEY: &str = "iso_3166_1_alpha3";

/// Region row from database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub path: Option<String>,
    pub created_at: String,
}

/// Everything the canonical region upsert writes.
#[derive(Debug, Clone, Default)]
pub struct RegionRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub parent_id: Option<&'a str>,
    pub path: Option<&'a str>,
    pub iso_alpha2: Option<&'a str>,
    pub iso_alpha3: Option<&'a str>,
    /// Wikidata id to record as provenance.
    pub wikidata_id: Option<&'a str>,
}

/// Create a region or overwrite its name, parent and path.
///
/// Codes are written as last-write-wins properties; provenance is
/// insert-or-ignore. A previously disambiguated name survives when the
/// incoming name is its undisambiguated form.
pub fn upsert_region(conn: &Connection, record: &RegionRecord<'_>) -> MergeOutcome {
    try_upsert_region(conn, record).into()
}

fn try_upsert_region(conn: &Connection, record: &RegionRecord<'_>) -> DbResult<MergeOutcome> {
    let outcome = write_with_name_recovery(conn, record.id, record.name, |name| {
        conn.execute(
            "INSERT INTO region (id, parent_id, name, path)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                 name = CASE
                     WHEN region.name = excluded.name || ' [' || region.id || ']' THEN region.name
                     ELSE excluded.name
                 END,
                 parent_id = excluded.parent_id,
                 path = excluded.path",
            params![record.id, record.parent_id, name, record.path],
        )?;
        Ok(())
    })?;

    if let Some(code) = record.iso_alpha2 {
        set_region_property(conn, record.id, ISO_ALPHA2_KEY, code)?;
    }
    if let Some(code) = record.iso_alpha3 {
        set_region_property(conn, record.id, ISO_ALPHA3_KEY, code)?;
    }
    if let Some(qid) = record.wikidata_id {
        let source = SourceRecord::wikidata(qid).with_data(serde_json::json!({
            "iso2": record.iso_alpha2,
            "iso3": record.iso_alpha3,
        }));
        add_source(conn, EntityKind::Region, record.id, &source)?;
    }

    debug!(id = record.id, name = record.name, "Upserted region");
    Ok(outcome)
}

/// Insert a region only if it is missing; never touches an existing row.
///
/// The row gets no parent and no path, so it cannot collide on
/// (parent, name); later stages attach it.
pub fn ensure_region_exists(conn: &Connection, id: &str, name: &str) -> DbResult<bool> {
    let inserted = conn.execute(
        "INSERT INTO region (id, parent_id, name, path)
         VALUES (?1, NULL, ?2, NULL)
         ON CONFLICT (id) DO NOTHING",
        params![id, name],
    )?;
    Ok(inserted > 0)
}

/// Insert a missing region directly under `parent_id`; returns `None` when
/// the region already exists, which leaves the row untouched.
///
/// The path is the parent's path plus the new id (null while the parent has
/// none). A (parent, name) collision is recovered by disambiguating the new
/// row's name.
pub fn ensure_region_under(
    conn: &Connection,
    id: &str,
    name: &str,
    parent_id: &str,
) -> DbResult<Option<MergeOutcome>> {
    if exists(conn, EntityKind::Region, id)? {
        return Ok(None);
    }
    let outcome = write_with_name_recovery(conn, id, name, |name| {
        conn.execute(
            "INSERT INTO region (id, parent_id, name, path)
             VALUES (?1, ?2, ?3, (SELECT path FROM region WHERE id = ?2) || '.' || ?1)",
            params![id, parent_id, name],
        )?;
        Ok(())
    })?;
    debug!(id, parent = parent_id, "Inserted referenced region");
    Ok(Some(outcome))
}

/// Set a scalar property (last write wins).
pub fn set_region_property(conn: &Connection, region_id: &str, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO region_property (id, region_id, key, value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (region_id, key) DO UPDATE SET value = excluded.value",
        params![Uuid::new_v4().to_string(), region_id, key, value],
    )?;
    Ok(())
}

/// Get a region by ID.
pub fn get_region(conn: &Connection, id: &str) -> DbResult<RegionRow> {
    conn.query_row(
        "SELECT id, parent_id, name, path, created_at FROM region WHERE id = ?1",
        params![id],
        |row| {
            Ok(RegionRow {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                name: row.get(2)?,
                path: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Region: {}", id)),
        e => DbError::Connection(e),
    })
}

/// Properties of a region as (key, value), sorted by key.
pub fn list_region_properties(conn: &Connection, region_id: &str) -> DbResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT key, value FROM region_property WHERE region_id = ?1 ORDER BY key",
    )?;
    let rows = stmt.query_map(params![region_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
}

/// Region ids whose alpha-2 code is one of `codes`, compared case-insensitively.
pub fn find_regions_by_alpha2(conn: &Connection, codes: &[String]) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT region_id FROM region_property
         WHERE key = ?1 AND upper(value) = upper(?2)",
    )?;
    let mut ids = Vec::new();
    for code in codes {
        let rows = stmt.query_map(params![ISO_ALPHA2_KEY, code], |row| row.get::<_, String>(0))?;
        for id in rows {
            ids.push(id?);
        }
    }
    Ok(ids)
}
