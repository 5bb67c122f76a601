//! # Atlas Graph
//!
//! Wikidata integration for atlas.
//!
//! Provides the query client (cache, throttle, retry), SPARQL query
//! builders, breadth-first region hierarchy discovery, and the sync
//! pipeline that merges everything into the SQLite store.

pub mod binding;
pub mod cache;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod hierarchy;
pub mod retry;
pub mod sparql;
pub mod sync;

pub use binding::Binding;
pub use cache::{batch_tag, CacheInfo, QueryCache, DEFAULT_CACHE_DIR};
pub use client::{ClientStats, QueryClient};
pub use endpoint::{EndpointConfig, OfflineService, QueryService, SparqlEndpoint};
pub use error::{FetchError, FetchResult};
pub use hierarchy::{Discovery, HierarchyDiscoverer};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use sync::{recompute_all_paths, run_full_sync, SyncReport, SyncStage};
