//! Store-wide materialized path recompute.
//!
//! Roots (no parent) get their own id as path; every other entity gets its
//! parent's path followed by `.` and its own id. Entities that cannot be
//! reached from a root (parent cycles) end up with no path. Only rows whose
//! stored path differs are written, so running this twice is a no-op.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use tracing::{info, warn};

use super::EntityKind;
use crate::connection::DbResult;

/// Counts from one recompute pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathRecompute {
    /// Entities reachable from a root.
    pub resolved: usize,
    /// Rows whose path was rewritten.
    pub updated: usize,
    /// Unreachable rows whose stale path was cleared.
    pub cleared: usize,
}

/// Every reachable entity's path, computed by a recursive closure over the
/// parent relation.
pub fn compute_paths(conn: &Connection, kind: EntityKind) -> DbResult<HashMap<String, String>> {
    let mut stmt = conn.prepare(&format!(
        "WITH RECURSIVE closure(id, path) AS (
             SELECT id, id FROM {table} WHERE parent_id IS NULL
             UNION ALL
             SELECT child.id, closure.path || '.' || child.id
             FROM {table} AS child
             JOIN closure ON child.parent_id = closure.id
         )
         SELECT id, path FROM closure",
        table = kind.table(),
    ))?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut paths = HashMap::new();
    for row in rows {
        let (id, path) = row?;
        paths.insert(id, path);
    }
    Ok(paths)
}

/// Recompute every path of `kind` and write the ones that changed.
pub fn recompute_paths(conn: &Connection, kind: EntityKind) -> DbResult<PathRecompute> {
    let computed = compute_paths(conn, kind)?;

    let stored: Vec<(String, Option<String>)> = {
        let mut stmt = conn.prepare(&format!("SELECT id, path FROM {} ORDER BY id", kind.table()))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<_, _>>()?
    };

    let mut update = conn.prepare(&format!("UPDATE {} SET path = ?2 WHERE id = ?1", kind.table()))?;
    let mut result = PathRecompute {
        resolved: computed.len(),
        ..Default::default()
    };

    for (id, current) in &stored {
        let target = computed.get(id);
        if target.map(String::as_str) == current.as_deref() {
            continue;
        }
        update.execute(params![id, target])?;
        match target {
            Some(_) => result.updated += 1,
            None => result.cleared += 1,
        }
    }

    if result.cleared > 0 {
        warn!(%kind, cleared = result.cleared, "Entities unreachable from any root; paths cleared");
    }
    info!(%kind, resolved = result.resolved, updated = result.updated, "Paths recomputed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::parents::set_parent;
    use crate::queries::regions::{ensure_region_exists, get_region};
    use crate::Database;

    fn chain(conn: &Connection) {
        for (id, name) in [("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")] {
            ensure_region_exists(conn, id, name).unwrap();
        }
        set_parent(conn, EntityKind::Region, "B", Some("A"), None).into_result().unwrap();
        set_parent(conn, EntityKind::Region, "C", Some("B"), None).into_result().unwrap();
    }

    #[test]
    fn test_recompute_builds_chain() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            chain(conn);
            let result = recompute_paths(conn, EntityKind::Region)?;
            assert_eq!(result.resolved, 4);
            assert_eq!(result.updated, 4);

            assert_eq!(get_region(conn, "A")?.path.as_deref(), Some("A"));
            assert_eq!(get_region(conn, "B")?.path.as_deref(), Some("A.B"));
            assert_eq!(get_region(conn, "C")?.path.as_deref(), Some("A.B.C"));
            assert_eq!(get_region(conn, "D")?.path.as_deref(), Some("D"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            chain(conn);
            recompute_paths(conn, EntityKind::Region)?;
            let second = recompute_paths(conn, EntityKind::Region)?;
            assert_eq!(second.updated, 0);
            assert_eq!(second.cleared, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_recompute_fixes_stale_paths() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            chain(conn);
            recompute_paths(conn, EntityKind::Region)?;
            conn.execute("UPDATE region SET path = 'garbage' WHERE id = 'C'", [])?;
            set_parent(conn, EntityKind::Region, "B", Some("D"), None).into_result()?;

            let result = recompute_paths(conn, EntityKind::Region)?;
            assert_eq!(result.updated, 2);
            assert_eq!(get_region(conn, "B")?.path.as_deref(), Some("D.B"));
            assert_eq!(get_region(conn, "C")?.path.as_deref(), Some("D.B.C"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_cycle_members_lose_their_path() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            chain(conn);
            recompute_paths(conn, EntityKind::Region)?;
            // A -> C closes the loop A -> B -> C -> A; nothing reaches a root.
            set_parent(conn, EntityKind::Region, "A", Some("C"), Some("A")).into_result()?;

            let result = recompute_paths(conn, EntityKind::Region)?;
            assert_eq!(result.resolved, 1);
            assert_eq!(result.cleared, 3);
            assert_eq!(get_region(conn, "B")?.path, None);
            assert_eq!(get_region(conn, "D")?.path.as_deref(), Some("D"));
            Ok(())
        })
        .unwrap();
    }
}
