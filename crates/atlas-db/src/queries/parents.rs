//! Collision-safe parent reassignment.
//!
//! Both hierarchy tables carry `UNIQUE (parent_id, name)`. Two upstream
//! entities with different ids can share a display name under one parent;
//! the second write then collides. Recovery happens inside a checkpoint:
//! roll back, suffix the entity's name with its id, and write again.

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::{current_name, EntityKind};
use crate::checkpoint::Checkpoint;
use crate::connection::{DbError, DbResult};

/// Result of a write that may hit a (parent, name) collision.
#[derive(Debug)]
pub enum MergeOutcome {
    /// Written as requested.
    Applied,
    /// Written after the entity was renamed to `renamed_to`.
    CollisionRecovered { renamed_to: String },
    /// Any other store error; the caller aborts the run.
    Failed(DbError),
}

impl MergeOutcome {
    /// Turn `Failed` into an error so callers can use `?`.
    pub fn into_result(self) -> DbResult<Self> {
        match self {
            Self::Failed(e) => Err(e),
            other => Ok(other),
        }
    }

    pub fn is_collision(&self) -> bool {
        matches!(self, Self::CollisionRecovered { .. })
    }
}

impl From<DbResult<MergeOutcome>> for MergeOutcome {
    fn from(result: DbResult<MergeOutcome>) -> Self {
        result.unwrap_or_else(MergeOutcome::Failed)
    }
}

/// `"<name> [<id>]"`, unless the suffix is already there.
pub fn disambiguated_name(name: &str, id: &str) -> String {
    let suffix = format!(" [{}]", id);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Set an entity's parent and path.
///
/// On a (parent, name) collision the entity is renamed and the update is
/// retried unconditionally, so the parent change is never lost.
pub fn set_parent(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    parent_id: Option<&str>,
    path: Option<&str>,
) -> MergeOutcome {
    try_set_parent(conn, kind, id, parent_id, path).into()
}

fn try_set_parent(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    parent_id: Option<&str>,
    path: Option<&str>,
) -> DbResult<MergeOutcome> {
    let checkpoint = Checkpoint::open(conn, "atlas_reparent")?;
    match write_parent(conn, kind, id, parent_id, path) {
        Ok(()) => {
            checkpoint.release()?;
            return Ok(MergeOutcome::Applied);
        }
        Err(e) if e.is_unique_violation() => checkpoint.rollback()?,
        Err(e) => return Err(e),
    }

    let name = current_name(conn, kind, id)?
        .ok_or_else(|| DbError::NotFound(format!("{}: {}", kind, id)))?;
    let renamed = disambiguated_name(&name, id);
    if renamed != name {
        conn.execute(
            &format!("UPDATE {} SET name = ?2 WHERE id = ?1", kind.table()),
            params![id, renamed],
        )?;
    }
    write_parent(conn, kind, id, parent_id, path)?;

    warn!(%kind, id, parent = ?parent_id, renamed = %renamed, "Name collision under new parent, disambiguated");
    Ok(MergeOutcome::CollisionRecovered { renamed_to: renamed })
}

fn write_parent(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
    parent_id: Option<&str>,
    path: Option<&str>,
) -> DbResult<()> {
    let changed = conn.execute(
        &format!("UPDATE {} SET parent_id = ?2, path = ?3 WHERE id = ?1", kind.table()),
        params![id, parent_id, path],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("{}: {}", kind, id)));
    }
    debug!(%kind, id, parent = ?parent_id, "Parent set");
    Ok(())
}

/// Run a name-bearing write; on a (parent, name) collision undo it and run it
/// once more with the disambiguated name.
pub(crate) fn write_with_name_recovery<F>(
    conn: &Connection,
    id: &str,
    name: &str,
    mut write: F,
) -> DbResult<MergeOutcome>
where
    F: FnMut(&str) -> DbResult<()>,
{
    let checkpoint = Checkpoint::open(conn, "atlas_upsert")?;
    match write(name) {
        Ok(()) => {
            checkpoint.release()?;
            Ok(MergeOutcome::Applied)
        }
        Err(e) if e.is_unique_violation() => {
            checkpoint.rollback()?;
            let renamed = disambiguated_name(name, id);
            write(&renamed)?;
            warn!(id, renamed = %renamed, "Name collision on upsert, disambiguated");
            Ok(MergeOutcome::CollisionRecovered { renamed_to: renamed })
        }
        Err(e) => Err(e),
    }
}
