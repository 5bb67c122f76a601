//! Atlas Core Library
//!
//! Domain vocabulary, run configuration and path resolution shared by the
//! store and the sync pipeline.

pub mod config;
pub mod error;
pub mod model;
pub mod path;

pub use config::SyncConfig;
pub use error::{AtlasError, AtlasResult};
pub use model::{LanguageLevel, RelationKind};
pub use path::{parent_map, resolve_path, ParentMap, PathCache};
