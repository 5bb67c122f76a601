//! Sync run configuration.
//!
//! Built once by the caller (the CLI maps flags and environment variables
//! onto it) and passed into the pipeline; library code never reads the
//! environment itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, AtlasResult};

/// Settings consumed by the sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Levels of subregions to discover below each top-level region.
    pub max_depth: usize,
    /// Frontier members per hierarchy query.
    pub batch_size: usize,
    /// Entity ids per alias query.
    pub alias_batch_size: usize,
    /// Delay before every upstream request, including the first attempt.
    pub throttle_ms: u64,
    /// Upstream attempts per query before giving up.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubled for each later retry.
    pub backoff_base_ms: u64,
    /// Id of the sentinel root region.
    pub root_id: String,
    /// Display name of the sentinel root region.
    pub root_name: String,
    /// Language code for labels and aliases.
    pub label_language: String,
    /// Restrict hierarchy discovery to these top-level regions (id or
    /// ISO alpha-2 code). Empty means all of them.
    pub seeds: Vec<String>,
    pub skip_hierarchy: bool,
    pub skip_languages: bool,
    pub skip_relations: bool,
    pub skip_aliases: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            batch_size: 40,
            alias_batch_size: 200,
            throttle_ms: 500,
            max_attempts: 4,
            backoff_base_ms: 2000,
            root_id: "world".to_string(),
            root_name: "World".to_string(),
            label_language: "en".to_string(),
            seeds: Vec::new(),
            skip_hierarchy: false,
            skip_languages: false,
            skip_relations: false,
            skip_aliases: false,
        }
    }
}

impl SyncConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> AtlasResult<()> {
        if self.batch_size == 0 {
            return Err(AtlasError::config("batch_size must be at least 1"));
        }
        if self.alias_batch_size == 0 {
            return Err(AtlasError::config("alias_batch_size must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(AtlasError::config("max_attempts must be at least 1"));
        }
        if self.root_id.trim().is_empty() {
            return Err(AtlasError::config("root_id must not be empty"));
        }
        if self.root_id.contains('.') {
            return Err(AtlasError::config("root_id must not contain '.'"));
        }
        if self.label_language.trim().is_empty() {
            return Err(AtlasError::config("label_language must not be empty"));
        }
        Ok(())
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.throttle(), Duration::from_millis(500));
        assert_eq!(config.root_id, "world");
    }

    #[test]
    fn test_rejects_zero_batch() {
        let config = SyncConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AtlasError::Config(_))));
    }

    #[test]
    fn test_rejects_dotted_root() {
        let config = SyncConfig {
            root_id: "earth.world".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"max_depth": 1, "skip_aliases": true}"#).unwrap();
        assert_eq!(config.max_depth, 1);
        assert!(config.skip_aliases);
        assert_eq!(config.batch_size, 40);
    }
}
