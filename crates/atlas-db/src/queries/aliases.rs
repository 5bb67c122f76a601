//! Alternative names, insert-or-ignore per (entity, alias).

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::EntityKind;
use crate::connection::{DbError, DbResult};

/// Attach an alias to an entity; returns whether a row was inserted.
pub fn insert_alias(conn: &Connection, kind: EntityKind, entity_id: &str, alias: &str) -> DbResult<bool> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {table} (id, {owner}, alias) VALUES (?1, ?2, ?3)
             ON CONFLICT ({owner}, alias) DO NOTHING",
            table = kind.alias_table(),
            owner = kind.owner_column(),
        ),
        params![Uuid::new_v4().to_string(), entity_id, alias],
    )?;
    Ok(inserted > 0)
}

/// Aliases of an entity, sorted.
pub fn list_aliases(conn: &Connection, kind: EntityKind, entity_id: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT alias FROM {table} WHERE {owner} = ?1 ORDER BY alias",
        table = kind.alias_table(),
        owner = kind.owner_column(),
    ))?;
    let rows = stmt.query_map(params![entity_id], |row| row.get(0))?;
    rows.collect::<Result<Vec<String>, _>>().map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::regions::ensure_region_exists;
    use crate::Database;

    #[test]
    fn test_alias_insert_or_ignore() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            ensure_region_exists(conn, "Q30", "United States")?;
            assert!(insert_alias(conn, EntityKind::Region, "Q30", "USA")?);
            assert!(insert_alias(conn, EntityKind::Region, "Q30", "America")?);
            assert!(!insert_alias(conn, EntityKind::Region, "Q30", "USA")?);
            assert_eq!(
                list_aliases(conn, EntityKind::Region, "Q30")?,
                vec!["America".to_string(), "USA".to_string()]
            );
            Ok(())
        })
        .unwrap();
    }
}
