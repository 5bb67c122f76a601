//! Language entity queries.
//!
//! Parent and path are deliberately not written here; they are assigned
//! once the whole classification graph is known.

use rusqlite::{params, Connection};
use tracing::debug;

use super::parents::{write_with_name_recovery, MergeOutcome};
use crate::connection::{DbError, DbResult};

/// Level given to languages created defensively.
pub const DEFAULT_LEVEL: &str = "language";

/// Language row from database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRow {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub level: String,
    pub path: Option<String>,
    pub created_at: String,
}

/// Create a language or overwrite its name and level.
pub fn upsert_language(conn: &Connection, id: &str, name: &str, level: &str) -> MergeOutcome {
    write_with_name_recovery(conn, id, name, |name| {
        write_language(conn, id, name, level)
    })
    .into()
}

fn write_language(conn: &Connection, id: &str, name: &str, level: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO language_entity (id, parent_id, name, level, path)
         VALUES (?1, NULL, ?2, ?3, NULL)
         ON CONFLICT (id) DO UPDATE SET
             name = CASE
                 WHEN language_entity.name = excluded.name || ' [' || language_entity.id || ']'
                     THEN language_entity.name
                 ELSE excluded.name
             END,
             level = excluded.level",
        params![id, name, level],
    )?;
    debug!(id, name, level, "Upserted language");
    Ok(())
}

/// Insert a language only if missing; existing rows are left alone.
pub fn ensure_language_exists(conn: &Connection, id: &str, name: &str) -> DbResult<bool> {
    let inserted = conn.execute(
        "INSERT INTO language_entity (id, parent_id, name, level, path)
         VALUES (?1, NULL, ?2, ?3, NULL)
         ON CONFLICT (id) DO NOTHING",
        params![id, name, DEFAULT_LEVEL],
    )?;
    Ok(inserted > 0)
}

/// Get a language by ID.
pub fn get_language(conn: &Connection, id: &str) -> DbResult<LanguageRow> {
    conn.query_row(
        "SELECT id, parent_id, name, level, path, created_at FROM language_entity WHERE id = ?1",
        params![id],
        |row| {
            Ok(LanguageRow {
                id: row.get(0)?,
                parent_id: row.get(1)?,
                name: row.get(2)?,
                level: row.get(3)?,
                path: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Language: {}", id)),
        e => DbError::Connection(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::parents::set_parent;
    use crate::queries::EntityKind;
    use crate::Database;

    #[test]
    fn test_upsert_leaves_parent_and_path() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            upsert_language(conn, "Q1", "Romance", "family").into_result()?;
            upsert_language(conn, "Q150", "French", "language").into_result()?;
            set_parent(conn, EntityKind::Language, "Q150", Some("Q1"), Some("Q1.Q150")).into_result()?;

            upsert_language(conn, "Q150", "French language", "dialect").into_result()?;
            let row = get_language(conn, "Q150")?;
            assert_eq!(row.name, "French language");
            assert_eq!(row.level, "dialect");
            assert_eq!(row.parent_id.as_deref(), Some("Q1"));
            assert_eq!(row.path.as_deref(), Some("Q1.Q150"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ensure_exists_then_upsert() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            assert!(ensure_language_exists(conn, "Q7", "placeholder")?);
            upsert_language(conn, "Q7", "Basque", "language").into_result()?;
            assert!(!ensure_language_exists(conn, "Q7", "placeholder")?);
            assert_eq!(get_language(conn, "Q7")?.name, "Basque");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_invalid_level_rejected() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let outcome = upsert_language(conn, "Q7", "Basque", "galaxy");
            assert!(matches!(outcome, MergeOutcome::Failed(_)));
            Ok(())
        })
        .unwrap();
    }
}
