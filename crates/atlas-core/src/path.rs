//! Incremental materialized path computation.
//!
//! Used for hierarchies that arrive as one flat edge list (the language
//! classification graph). A path is the parent's path, a `.`, and the
//! entity's own id; an entity without a known parent is its own path.
//!
//! Resolution walks up the parent chain iteratively and memoizes every path
//! it builds in a [`PathCache`], so deep hierarchies cost no stack and every
//! ancestor is computed once per run.

use std::collections::{HashMap, HashSet};

/// Child id -> parent id.
pub type ParentMap = HashMap<String, String>;

/// Build a parent map from (child, parent) edges.
///
/// Self-edges are ignored. When a child appears with several parents the
/// last edge wins, so callers that need a stable result pass edges in a
/// stable order.
pub fn parent_map<I, C, P>(edges: I) -> ParentMap
where
    I: IntoIterator<Item = (C, P)>,
    C: Into<String>,
    P: Into<String>,
{
    let mut parents = ParentMap::new();
    for (child, parent) in edges {
        let (child, parent) = (child.into(), parent.into());
        if child != parent {
            parents.insert(child, parent);
        }
    }
    parents
}

/// Memoized paths for one run.
#[derive(Debug, Default, Clone)]
pub struct PathCache {
    paths: HashMap<String, String>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Path of `id` under `parents`, reusing and filling `cache`.
///
/// A parent cycle is cut at the ancestor that closes it: that ancestor is
/// treated as a root.
pub fn resolve_path(id: &str, parents: &ParentMap, cache: &mut PathCache) -> String {
    if let Some(path) = cache.get(id) {
        return path.to_string();
    }

    let mut chain: Vec<&str> = Vec::new();
    let mut on_chain: HashSet<&str> = HashSet::new();
    let mut base: Option<String> = None;
    let mut current = id;

    loop {
        if let Some(path) = cache.get(current) {
            base = Some(path.to_string());
            break;
        }
        if !on_chain.insert(current) {
            break;
        }
        chain.push(current);
        match parents.get(current) {
            Some(parent) => current = parent.as_str(),
            None => break,
        }
    }

    for node in chain.into_iter().rev() {
        let path = match base {
            Some(ref prefix) => format!("{}.{}", prefix, node),
            None => node.to_string(),
        };
        cache.paths.insert(node.to_string(), path.clone());
        base = Some(path);
    }

    base.unwrap_or_else(|| id.to_string())
}
