//! On-disk query result cache.
//!
//! One JSON file per caller-chosen tag. The cache lives outside the store
//! transaction: a run that fails and rolls back keeps whatever it fetched,
//! so the retry replays those queries from disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::Binding;
use crate::error::FetchResult;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".atlas/cache";

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    tag: String,
    fetched_at: DateTime<Utc>,
    bindings: Vec<Binding>,
}

/// Older cache files hold the bare row array.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Entry(CacheEntry),
    Bare(Vec<Binding>),
}

/// Summary of one cached result, for listing.
#[derive(Debug, Clone)]
pub struct CacheInfo {
    pub tag: String,
    pub rows: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    dir: PathBuf,
}

impl QueryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `tag`.
    pub fn path_for(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_tag(tag)))
    }

    /// Cached rows for `tag`, if any.
    pub fn load(&self, tag: &str) -> FetchResult<Option<Vec<Binding>>> {
        let path = self.path_for(tag);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let rows = match serde_json::from_str(&raw)? {
            StoredEntry::Entry(entry) => entry.bindings,
            StoredEntry::Bare(rows) => rows,
        };
        debug!(tag, rows = rows.len(), "Cache hit");
        Ok(Some(rows))
    }

    /// Persist rows under `tag`. Written to a temporary file and renamed so
    /// an interrupted write never leaves a truncated entry behind.
    pub fn store(&self, tag: &str, rows: &[Binding]) -> FetchResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            tag: tag.to_string(),
            fetched_at: Utc::now(),
            bindings: rows.to_vec(),
        };
        let path = self.path_for(tag);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!(tag, rows = rows.len(), path = %path.display(), "Cached query result");
        Ok(())
    }

    /// Every cached entry, sorted by tag.
    pub fn list(&self) -> FetchResult<Vec<CacheInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut infos = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = std::fs::metadata(&path)?.len();
            let raw = std::fs::read_to_string(&path)?;
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let info = match serde_json::from_str(&raw)? {
                StoredEntry::Entry(entry) => CacheInfo {
                    tag: entry.tag,
                    rows: entry.bindings.len(),
                    fetched_at: Some(entry.fetched_at),
                    bytes,
                },
                StoredEntry::Bare(rows) => CacheInfo {
                    tag: stem,
                    rows: rows.len(),
                    fetched_at: None,
                    bytes,
                },
            };
            infos.push(info);
        }
        infos.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(infos)
    }

    /// Delete every cached entry; returns how many were removed.
    pub fn clear(&self) -> FetchResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Keep tags filesystem-safe.
fn sanitize_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Content-addressed tag for a batched query: the same members always map
/// to the same tag, whatever batch size or position produced them.
pub fn batch_tag(prefix: &str, members: &[String]) -> String {
    // FNV-1a, stable across platforms and releases.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            hash ^= u64::from(b',');
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        for byte in member.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    format!("{}_{:016x}", prefix, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path().join("cache"));
        let rows = vec![Binding::from_pairs([("c", "Q1")])];

        assert!(cache.load("countries").unwrap().is_none());
        cache.store("countries", &rows).unwrap();
        assert_eq!(cache.load("countries").unwrap(), Some(rows));
    }

    #[test]
    fn test_loads_bare_row_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        std::fs::write(cache.path_for("legacy"), r#"[{"c": "Q9"}]"#).unwrap();

        let rows = cache.load("legacy").unwrap().unwrap();
        assert_eq!(rows[0].get("c"), Some("Q9"));
    }

    #[test]
    fn test_list_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QueryCache::new(dir.path());
        cache.store("b", &[]).unwrap();
        cache.store("a", &[Binding::from_pairs([("x", "1")])]).unwrap();

        let infos = cache.list().unwrap();
        assert_eq!(infos.iter().map(|i| i.tag.as_str()).collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(infos[0].rows, 1);

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.list().unwrap().is_empty());
    }

    #[test]
    fn test_tag_sanitized() {
        let cache = QueryCache::new("/tmp/x");
        assert_eq!(cache.path_for("a/b c"), PathBuf::from("/tmp/x/a_b_c.json"));
    }

    #[test]
    fn test_batch_tag_depends_on_members_only() {
        let a = vec!["Q1".to_string(), "Q2".to_string()];
        let b = vec!["Q1".to_string(), "Q2".to_string()];
        let c = vec!["Q12".to_string()];
        let d = vec!["Q1".to_string(), "Q3".to_string()];

        assert_eq!(batch_tag("sub", &a), batch_tag("sub", &b));
        assert_ne!(batch_tag("sub", &a), batch_tag("sub", &c));
        assert_ne!(batch_tag("sub", &a), batch_tag("sub", &d));
        assert!(batch_tag("sub", &a).starts_with("sub_"));
    }
}
