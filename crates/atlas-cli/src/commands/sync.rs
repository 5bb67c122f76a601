//! Sync command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use atlas_core::SyncConfig;
use atlas_graph::{
    EndpointConfig, OfflineService, QueryCache, QueryClient, QueryService, RetryPolicy, SparqlEndpoint,
};

use super::Workspace;
use crate::output;

// Unset options fall back to `SyncConfig::default()` and `EndpointConfig::default()`.
#[derive(Args)]
pub struct SyncArgs {
    /// Levels of subregions to discover below each top-level region
    #[arg(long, env = "ATLAS_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Regions per hierarchy query
    #[arg(long, env = "ATLAS_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Entities per alias query
    #[arg(long, env = "ATLAS_ALIAS_BATCH_SIZE")]
    pub alias_batch_size: Option<usize>,

    /// Delay before every upstream request, in milliseconds
    #[arg(long, env = "ATLAS_THROTTLE_MS")]
    pub throttle_ms: Option<u64>,

    /// Attempts per query before giving up
    #[arg(long, env = "ATLAS_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Backoff before the first retry, in milliseconds (doubles per retry)
    #[arg(long, env = "ATLAS_BACKOFF_MS")]
    pub backoff_ms: Option<u64>,

    /// Id of the root region
    #[arg(long, env = "ATLAS_ROOT_ID")]
    pub root_id: Option<String>,

    /// Name of the root region
    #[arg(long, env = "ATLAS_ROOT_NAME")]
    pub root_name: Option<String>,

    /// Language code for labels and aliases
    #[arg(long, env = "ATLAS_LANGUAGE")]
    pub language: Option<String>,

    /// Only discover subregions of this top-level region (id or ISO alpha-2 code); repeatable
    #[arg(long = "seed", value_name = "REGION")]
    pub seeds: Vec<String>,

    /// Skip subregion discovery
    #[arg(long)]
    pub skip_hierarchy: bool,

    /// Skip languages and their classification
    #[arg(long)]
    pub skip_languages: bool,

    /// Skip language-region relations
    #[arg(long)]
    pub skip_relations: bool,

    /// Skip alias enrichment
    #[arg(long)]
    pub skip_aliases: bool,

    /// SPARQL endpoint URL
    #[arg(long, env = "ATLAS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// User agent sent to the endpoint
    #[arg(long, env = "ATLAS_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "ATLAS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Answer only from the query cache; uncached queries fail the run
    #[arg(long, conflicts_with = "no_cache")]
    pub offline: bool,

    /// Neither read nor write the query cache
    #[arg(long)]
    pub no_cache: bool,
}

impl SyncArgs {
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            alias_batch_size: self.alias_batch_size.unwrap_or(defaults.alias_batch_size),
            throttle_ms: self.throttle_ms.unwrap_or(defaults.throttle_ms),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            backoff_base_ms: self.backoff_ms.unwrap_or(defaults.backoff_base_ms),
            root_id: self.root_id.clone().unwrap_or(defaults.root_id),
            root_name: self.root_name.clone().unwrap_or(defaults.root_name),
            label_language: self.language.clone().unwrap_or(defaults.label_language),
            seeds: self.seeds.clone(),
            skip_hierarchy: self.skip_hierarchy,
            skip_languages: self.skip_languages,
            skip_relations: self.skip_relations,
            skip_aliases: self.skip_aliases,
        }
    }

    pub fn endpoint_config(&self) -> EndpointConfig {
        let defaults = EndpointConfig::default();
        EndpointConfig {
            url: self.endpoint.clone().unwrap_or(defaults.url),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout_secs: self.timeout.unwrap_or(defaults.timeout_secs),
        }
    }
}

fn build_client(
    args: &SyncArgs,
    config: &SyncConfig,
    endpoint: &EndpointConfig,
    workspace: &Workspace,
) -> Result<QueryClient> {
    let service: Arc<dyn QueryService> = if args.offline {
        Arc::new(OfflineService)
    } else {
        Arc::new(SparqlEndpoint::new(endpoint).context("Failed to build HTTP client")?)
    };

    // Offline runs never reach the network, so there is nothing to pace.
    let throttle = if args.offline { Duration::ZERO } else { config.throttle() };
    let mut client = QueryClient::new(service)
        .with_retry(RetryPolicy::new(config.max_attempts, config.backoff_base()))
        .with_throttle(throttle);
    if !args.no_cache {
        client = client.with_cache(QueryCache::new(&workspace.cache_dir));
    }
    Ok(client)
}

pub async fn execute(args: SyncArgs, workspace: &Workspace) -> Result<()> {
    let config = args.sync_config();
    if let Err(e) = config.validate() {
        bail!("Invalid sync options: {}", e);
    }

    let endpoint = args.endpoint_config();
    let client = build_client(&args, &config, &endpoint, workspace)?;
    let mut db = workspace.open_db()?;

    println!("{} Syncing into {}", "→".blue().bold(), workspace.db.display().to_string().cyan());
    if args.offline {
        println!("  {}", format!("offline, replaying {}", workspace.cache_dir.display()).dimmed());
    } else if workspace.verbose {
        println!("  {}", format!("endpoint {}", endpoint.url).dimmed());
    }

    let report = atlas_graph::run_full_sync(db.conn_mut(), &client, &config).await?;

    output::print_sync_report(&report);
    Ok(())
}
