//! Wikidata to SQLite synchronization pipeline.
//!
//! Stages run in order inside one immediate transaction:
//! bootstrap, top-level regions, hierarchy, languages, relations, language
//! parents, aliases, final path recompute. The transaction is committed
//! once at the end; any error rolls the whole run back. Fetched query
//! results stay in the on-disk cache, so a rerun resumes cheaply.

pub mod aliases;
pub mod languages;
pub mod regions;
pub mod relations;

use std::fmt;

use anyhow::{Context, Result};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{error, info, warn};

use atlas_core::SyncConfig;
use atlas_db::queries::paths::{recompute_paths, PathRecompute};
use atlas_db::EntityKind;

use crate::client::QueryClient;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    Bootstrap,
    TopLevel,
    Hierarchy,
    Leaves,
    Relations,
    LeafParents,
    Aliases,
    FinalRecompute,
    Commit,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::TopLevel => "top_level",
            Self::Hierarchy => "hierarchy",
            Self::Leaves => "leaves",
            Self::Relations => "relations",
            Self::LeafParents => "leaf_parents",
            Self::Aliases => "aliases",
            Self::FinalRecompute => "final_recompute",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts from one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub top_level: usize,
    pub seeds: usize,
    pub subregion_pairs: usize,
    pub regions_visited: usize,
    pub languages: usize,
    pub language_sources: usize,
    pub relations: usize,
    pub language_parents: usize,
    pub aliases: usize,
    /// Name collisions recovered by disambiguation, all stages.
    pub collisions: usize,
    pub region_paths: PathRecompute,
    pub language_paths: PathRecompute,
    pub skipped: Vec<SyncStage>,
    /// Upstream attempts made during the run.
    pub requests: usize,
    pub cache_hits: usize,
}

/// Run the full pipeline and commit it as one transaction.
pub async fn run_full_sync(conn: &mut Connection, client: &QueryClient, config: &SyncConfig) -> Result<SyncReport> {
    config.validate().context("Invalid sync configuration")?;
    info!(
        root = %config.root_id,
        max_depth = config.max_depth,
        batch_size = config.batch_size,
        "Starting full sync"
    );

    let before = client.stats();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to open sync transaction")?;

    let mut report = match run_stages(&tx, client, config).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Sync failed, rolling back");
            if let Err(rollback) = tx.rollback() {
                warn!(error = %rollback, "Rollback failed");
            }
            return Err(e);
        }
    };

    tx.commit().with_context(|| format!("Failed at stage {}", SyncStage::Commit))?;

    let after = client.stats();
    report.requests = after.requests - before.requests;
    report.cache_hits = after.cache_hits - before.cache_hits;

    info!(
        top_level = report.top_level,
        subregions = report.subregion_pairs,
        languages = report.languages,
        relations = report.relations,
        aliases = report.aliases,
        collisions = report.collisions,
        requests = report.requests,
        cache_hits = report.cache_hits,
        "Full sync complete"
    );
    Ok(report)
}

async fn run_stages(conn: &Connection, client: &QueryClient, config: &SyncConfig) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    regions::bootstrap_root(conn, config).context("Failed to bootstrap root region")?;
    info!(stage = %SyncStage::Bootstrap, root = %config.root_id, "Stage done");

    let top_level = regions::sync_top_level(conn, client, config)
        .await
        .context("Failed to sync top-level regions")?;
    report.top_level = top_level.ids.len();
    report.collisions += top_level.collisions;
    info!(stage = %SyncStage::TopLevel, regions = report.top_level, "Stage done");

    if config.skip_hierarchy {
        report.skipped.push(SyncStage::Hierarchy);
    } else {
        let seeds = regions::select_seeds(conn, config, &top_level.ids).context("Failed to select hierarchy seeds")?;
        report.seeds = seeds.len();
        let discoveries = regions::discover_hierarchy(conn, client, config, &seeds)
            .await
            .context("Failed to discover region hierarchy")?;
        for discovery in &discoveries {
            report.subregion_pairs += discovery.pairs;
            report.regions_visited += discovery.visited;
            report.collisions += discovery.collisions;
        }
        info!(
            stage = %SyncStage::Hierarchy,
            seeds = report.seeds,
            pairs = report.subregion_pairs,
            "Stage done"
        );
    }

    if config.skip_languages {
        report.skipped.push(SyncStage::Leaves);
    } else {
        let leaves = languages::sync_languages(conn, client, config)
            .await
            .context("Failed to sync languages")?;
        report.languages = leaves.languages;
        report.language_sources = leaves.sources;
        report.collisions += leaves.collisions;
        info!(stage = %SyncStage::Leaves, languages = leaves.languages, sources = leaves.sources, "Stage done");
    }

    if config.skip_relations {
        report.skipped.push(SyncStage::Relations);
    } else {
        let linked = relations::sync_relations(conn, client, config)
            .await
            .context("Failed to sync language-region relations")?;
        report.relations = linked.links;
        report.collisions += linked.collisions;
        info!(
            stage = %SyncStage::Relations,
            links = linked.links,
            regions_added = linked.regions_added,
            "Stage done"
        );
    }

    if config.skip_languages {
        report.skipped.push(SyncStage::LeafParents);
    } else {
        let parents = languages::assign_language_parents(conn, client, config)
            .await
            .context("Failed to assign language parents")?;
        report.language_parents = parents.assigned;
        report.collisions += parents.collisions;
        info!(
            stage = %SyncStage::LeafParents,
            assigned = parents.assigned,
            cycles_cut = parents.cut,
            "Stage done"
        );
    }

    if config.skip_aliases {
        report.skipped.push(SyncStage::Aliases);
    } else {
        report.aliases = aliases::sync_aliases(conn, client, config)
            .await
            .context("Failed to sync aliases")?;
        info!(stage = %SyncStage::Aliases, inserted = report.aliases, "Stage done");
    }

    let (region_paths, language_paths) = recompute(conn).context("Failed to recompute paths")?;
    report.region_paths = region_paths;
    report.language_paths = language_paths;
    info!(
        stage = %SyncStage::FinalRecompute,
        region_updates = region_paths.updated,
        language_updates = language_paths.updated,
        "Stage done"
    );

    Ok(report)
}

fn recompute(conn: &Connection) -> Result<(PathRecompute, PathRecompute)> {
    let regions = recompute_paths(conn, EntityKind::Region)?;
    let languages = recompute_paths(conn, EntityKind::Language)?;
    Ok((regions, languages))
}

/// Run only the final path recompute, in its own transaction.
pub fn recompute_all_paths(conn: &mut Connection) -> Result<(PathRecompute, PathRecompute)> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to open recompute transaction")?;
    let result = recompute(&tx).context("Failed to recompute paths")?;
    tx.commit().context("Failed to commit recomputed paths")?;
    Ok(result)
}
