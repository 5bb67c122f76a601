//! Nested SAVEPOINT guard.
//!
//! A checkpoint lets one statement group fail and be undone without
//! discarding the enclosing run transaction. Dropping an unfinished
//! checkpoint rolls it back.

use rusqlite::Connection;
use tracing::warn;

use crate::connection::DbResult;

pub struct Checkpoint<'c> {
    conn: &'c Connection,
    name: &'static str,
    active: bool,
}

impl<'c> Checkpoint<'c> {
    /// Open a savepoint named `name` on the connection.
    pub fn open(conn: &'c Connection, name: &'static str) -> DbResult<Self> {
        conn.execute_batch(&format!("SAVEPOINT {}", name))?;
        Ok(Self {
            conn,
            name,
            active: true,
        })
    }

    /// Keep everything written since the checkpoint was opened.
    pub fn release(mut self) -> DbResult<()> {
        self.active = false;
        self.conn.execute_batch(&format!("RELEASE {}", self.name))?;
        Ok(())
    }

    /// Undo everything written since the checkpoint was opened.
    pub fn rollback(mut self) -> DbResult<()> {
        self.active = false;
        self.undo()
    }

    fn undo(&self) -> DbResult<()> {
        self.conn
            .execute_batch(&format!("ROLLBACK TO {0}; RELEASE {0}", self.name))?;
        Ok(())
    }
}

impl Drop for Checkpoint<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.undo() {
                warn!(checkpoint = self.name, error = %e, "Failed to roll back checkpoint");
            }
        }
    }
}
