//! Query cache commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use atlas_graph::QueryCache;

use super::Workspace;
use crate::output;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached query results
    List,

    /// Delete every cached query result
    Clear,
}

pub fn execute(cmd: CacheCommands, workspace: &Workspace) -> Result<()> {
    let cache = QueryCache::new(&workspace.cache_dir);
    match cmd {
        CacheCommands::List => {
            let entries = cache.list().context("Failed to list query cache")?;
            output::print_cache_table(&entries);
            Ok(())
        }
        CacheCommands::Clear => {
            let removed = cache.clear().context("Failed to clear query cache")?;
            println!(
                "{} Removed {} cached result(s) from {}",
                "✓".green().bold(),
                removed,
                cache.dir().display()
            );
            Ok(())
        }
    }
}
