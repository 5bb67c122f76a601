//! Status command.

use anyhow::{Context, Result};
use colored::Colorize;

use atlas_db::queries::stats::{count_missing_paths, table_counts};
use atlas_db::EntityKind;

use super::Workspace;
use crate::output;

pub fn execute(workspace: &Workspace) -> Result<()> {
    if !workspace.db.exists() {
        println!("{}", format!("No database at {}. Run 'atlas sync' first.", workspace.db.display()).dimmed());
        return Ok(());
    }

    let db = workspace.open_db()?;
    let (counts, missing) = db
        .with_conn(|conn| {
            let counts = table_counts(conn)?;
            let missing = vec![
                (EntityKind::Region, count_missing_paths(conn, EntityKind::Region)?),
                (EntityKind::Language, count_missing_paths(conn, EntityKind::Language)?),
            ];
            Ok((counts, missing))
        })
        .context("Failed to read store status")?;

    println!("{} {}", "Store".bold(), workspace.db.display().to_string().cyan());
    output::print_status(&counts, &missing);
    Ok(())
}
