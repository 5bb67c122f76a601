//! Database migrations.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::connection::{DbError, DbResult};

/// SQL schema definition.
const SCHEMA: &str = include_str!("schema.sql");

/// Run all database migrations.
pub fn run_migrations(conn: &mut Connection) -> DbResult<()> {
    let migrations = Migrations::new(vec![M::up(SCHEMA)]);

    migrations
        .to_latest(conn)
        .map_err(|e| DbError::Migration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn test_migrations() {
        let db = Database::in_memory().unwrap();

        db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('region', 'language_entity', 'language_entity_region')",
                [],
                |row| row.get(0),
            )?;
            assert_eq!(count, 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_migrations_are_reentrant() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        super::run_migrations(&mut conn).unwrap();
        super::run_migrations(&mut conn).unwrap();
    }
}
