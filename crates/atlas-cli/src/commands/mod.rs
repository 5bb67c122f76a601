//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use atlas_db::Database;

pub mod cache;
pub mod recompute;
pub mod status;
pub mod sync;

/// Atlas - incremental region and language graph sync
#[derive(Parser)]
#[command(name = "atlas")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// SQLite database file
    #[arg(long, global = true, env = "ATLAS_DB", default_value = ".atlas/atlas.db")]
    pub db: PathBuf,

    /// Directory holding cached query results
    #[arg(long, global = true, env = "ATLAS_CACHE_DIR", default_value = atlas_graph::DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Also write logs (without colors) to this file
    #[arg(long, global = true, env = "ATLAS_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync regions and languages from the upstream graph
    Sync(sync::SyncArgs),

    /// Recompute materialized paths for every region and language
    Recompute,

    /// Show table counts and entities without a path
    Status,

    /// Inspect or clear the query cache
    #[command(subcommand)]
    Cache(cache::CacheCommands),
}

/// Paths shared by every command.
pub struct Workspace {
    pub db: PathBuf,
    pub cache_dir: PathBuf,
    pub verbose: bool,
}

impl Workspace {
    pub fn open_db(&self) -> Result<Database> {
        Database::open(&self.db).with_context(|| format!("Failed to open database {}", self.db.display()))
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let workspace = Workspace {
            db: self.db,
            cache_dir: self.cache_dir,
            verbose: self.verbose,
        };

        match self.command {
            Commands::Sync(args) => sync::execute(args, &workspace).await,
            Commands::Recompute => recompute::execute(&workspace),
            Commands::Status => status::execute(&workspace),
            Commands::Cache(cmd) => cache::execute(cmd, &workspace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "atlas",
            "--db",
            "/tmp/a.db",
            "sync",
            "--max-depth",
            "1",
            "--seed",
            "FR",
            "--seed",
            "Q31",
            "--skip-aliases",
        ])
        .unwrap();
        assert_eq!(cli.db, PathBuf::from("/tmp/a.db"));
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        let config = args.sync_config();
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.seeds, vec!["FR", "Q31"]);
        assert!(config.skip_aliases);
        assert!(!config.skip_relations);
        assert_eq!(config.batch_size, 40);
    }

    #[test]
    fn test_parse_cache_clear() {
        let cli = Cli::try_parse_from(["atlas", "cache", "clear"]).unwrap();
        assert!(matches!(cli.command, Commands::Cache(cache::CacheCommands::Clear)));
    }
}
