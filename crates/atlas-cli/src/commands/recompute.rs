//! Path recompute command.

use anyhow::Result;
use colored::Colorize;

use super::Workspace;
use crate::output;

pub fn execute(workspace: &Workspace) -> Result<()> {
    let mut db = workspace.open_db()?;
    println!("{} Recomputing paths in {}", "→".blue().bold(), workspace.db.display().to_string().cyan());

    let (regions, languages) = atlas_graph::recompute_all_paths(db.conn_mut())?;

    output::print_path_recompute("Regions", &regions);
    output::print_path_recompute("Languages", &languages);
    println!("\n{} Paths are consistent.", "✓".green().bold());
    Ok(())
}
