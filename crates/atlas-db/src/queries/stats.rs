//! Read-only counts for status reporting.

use rusqlite::Connection;

use super::EntityKind;
use crate::connection::DbResult;

const TABLES: &[&str] = &[
    "region",
    "region_property",
    "region_source",
    "region_alias",
    "language_entity",
    "language_entity_source",
    "language_entity_alias",
    "language_entity_region",
];

/// Row count per table, in schema order.
pub fn table_counts(conn: &Connection) -> DbResult<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        counts.push((*table, count));
    }
    Ok(counts)
}

/// Number of entities of `kind` that currently have no path.
pub fn count_missing_paths(conn: &Connection, kind: EntityKind) -> DbResult<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE path IS NULL", kind.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::regions::ensure_region_exists;
    use crate::Database;

    #[test]
    fn test_counts() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            ensure_region_exists(conn, "Q1", "One")?;
            let counts = table_counts(conn)?;
            assert_eq!(counts.len(), TABLES.len());
            assert_eq!(counts[0], ("region", 1));
            assert_eq!(count_missing_paths(conn, EntityKind::Region)?, 1);
            assert_eq!(count_missing_paths(conn, EntityKind::Language)?, 0);
            Ok(())
        })
        .unwrap();
    }
}
