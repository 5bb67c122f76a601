//! Language <-> region relations.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::connection::{DbError, DbResult};

/// Relation row from database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegionRow {
    pub language_id: String,
    pub region_id: String,
    pub relation: String,
}

/// Link a language to a region. One row per pair; the relation label is
/// overwritten by the latest write.
pub fn link_language_region(conn: &Connection, language_id: &str, region_id: &str, relation: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO language_entity_region (id, language_entity_id, region_id, relation)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (language_entity_id, region_id) DO UPDATE SET relation = excluded.relation",
        params![Uuid::new_v4().to_string(), language_id, region_id, relation],
    )?;
    Ok(())
}

/// Relations of a language, sorted by region.
pub fn list_language_regions(conn: &Connection, language_id: &str) -> DbResult<Vec<LanguageRegionRow>> {
    let mut stmt = conn.prepare(
        "SELECT language_entity_id, region_id, relation FROM language_entity_region
         WHERE language_entity_id = ?1 ORDER BY region_id",
    )?;
    let rows = stmt.query_map(params![language_id], |row| {
        Ok(LanguageRegionRow {
            language_id: row.get(0)?,
            region_id: row.get(1)?,
            relation: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::languages::ensure_language_exists;
    use crate::queries::regions::ensure_region_exists;
    use crate::Database;

    #[test]
    fn test_relation_last_write_wins() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            ensure_language_exists(conn, "Q1860", "English")?;
            ensure_region_exists(conn, "Q145", "United Kingdom")?;

            link_language_region(conn, "Q1860", "Q145", "used")?;
            link_language_region(conn, "Q1860", "Q145", "official")?;

            let rows = list_language_regions(conn, "Q1860")?;
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].relation, "official");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_link_requires_both_endpoints() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            ensure_language_exists(conn, "Q1860", "English")?;
            assert!(link_language_region(conn, "Q1860", "Q145", "used").is_err());
            Ok(())
        })
        .unwrap();
    }
}
