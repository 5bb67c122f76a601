//! Breadth-first subregion discovery.
//!
//! Starting from one seed region, each level's frontier is split into
//! batches and the service is asked which regions are directly contained by
//! any batch member. Every reported (child, parent) pair is written through:
//! both ends are ensured to exist, and the child is moved under the parent
//! with its path cleared. Paths are filled in by the final recompute.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

use atlas_db::queries::parents::set_parent;
use atlas_db::queries::regions::ensure_region_exists;
use atlas_db::{EntityKind, MergeOutcome};

use crate::cache::batch_tag;
use crate::client::QueryClient;
use crate::sparql;

/// What one seed's traversal did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub seed: String,
    /// Frontier size at each expanded level, starting with the seed level.
    pub frontier_sizes: Vec<usize>,
    /// (child, parent) pairs written.
    pub pairs: usize,
    /// Distinct regions placed in any frontier, seed included.
    pub visited: usize,
    pub collisions: usize,
}

impl Discovery {
    /// Number of levels expanded.
    pub fn depth(&self) -> usize {
        self.frontier_sizes.len()
    }
}

/// One row of a subregion answer, with labels resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ContainmentPair {
    child: String,
    parent: String,
    child_name: String,
    parent_name: String,
}

pub struct HierarchyDiscoverer<'a> {
    client: &'a QueryClient,
    max_depth: usize,
    batch_size: usize,
    label_language: &'a str,
}

impl<'a> HierarchyDiscoverer<'a> {
    pub fn new(client: &'a QueryClient, max_depth: usize, batch_size: usize, label_language: &'a str) -> Self {
        Self {
            client,
            max_depth,
            batch_size: batch_size.max(1),
            label_language,
        }
    }

    /// Expand `seed` up to the configured depth.
    pub async fn discover(&self, conn: &Connection, seed: &str) -> Result<Discovery> {
        let mut discovery = Discovery {
            seed: seed.to_string(),
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::from([seed.to_string()]);
        let mut frontier = vec![seed.to_string()];

        for depth in 1..=self.max_depth {
            if frontier.is_empty() {
                break;
            }
            frontier.sort();
            frontier.dedup();
            discovery.frontier_sizes.push(frontier.len());

            let mut next = Vec::new();
            for batch in frontier.chunks(self.batch_size) {
                for pair in self.fetch_pairs(batch).await? {
                    if self.link(conn, &pair, &mut discovery)? && seen.insert(pair.child.clone()) {
                        next.push(pair.child);
                    }
                }
            }

            debug!(seed, depth, expanded = frontier.len(), found = next.len(), "Level done");
            frontier = next;
        }

        discovery.visited = seen.len();
        info!(
            seed,
            levels = discovery.depth(),
            pairs = discovery.pairs,
            visited = discovery.visited,
            collisions = discovery.collisions,
            "Hierarchy discovered"
        );
        Ok(discovery)
    }

    /// Containment pairs for one batch, in (child, parent) order.
    async fn fetch_pairs(&self, batch: &[String]) -> Result<Vec<ContainmentPair>> {
        let tag = batch_tag(&format!("subregions_{}", self.label_language), batch);
        let query = sparql::subregions(batch, self.label_language);
        let rows = self
            .client
            .fetch(&query, Some(tag.as_str()))
            .await
            .with_context(|| format!("Failed to fetch subregions (batch {})", tag))?;

        let mut pairs: Vec<ContainmentPair> = rows
            .iter()
            .filter_map(|row| {
                let child = row.id("child")?;
                let parent = row.id("parent")?;
                Some(ContainmentPair {
                    child: child.to_string(),
                    parent: parent.to_string(),
                    child_name: row.label("childLabel", child).to_string(),
                    parent_name: row.label("parentLabel", parent).to_string(),
                })
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        Ok(pairs)
    }

    /// Write one pair; returns false for ignored self-edges.
    fn link(&self, conn: &Connection, pair: &ContainmentPair, discovery: &mut Discovery) -> Result<bool> {
        if pair.child == pair.parent {
            debug!(id = %pair.child, "Ignoring self-containment");
            return Ok(false);
        }

        ensure_region_exists(conn, &pair.parent, &pair.parent_name)
            .with_context(|| format!("Failed to ensure region {}", pair.parent))?;
        ensure_region_exists(conn, &pair.child, &pair.child_name)
            .with_context(|| format!("Failed to ensure region {}", pair.child))?;

        match set_parent(conn, EntityKind::Region, &pair.child, Some(pair.parent.as_str()), None) {
            MergeOutcome::Applied => {}
            MergeOutcome::CollisionRecovered { .. } => discovery.collisions += 1,
            MergeOutcome::Failed(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to move region {} under {}", pair.child, pair.parent)
                })
            }
        }
        discovery.pairs += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use atlas_db::queries::regions::get_region;
    use atlas_db::Database;

    use crate::binding::Binding;
    use crate::endpoint::QueryService;
    use crate::error::FetchResult;

    /// Answers subregion queries from an in-memory containment map.
    #[derive(Default)]
    struct TreeService {
        children: HashMap<String, Vec<(String, String)>>,
        queries: AtomicUsize,
        expanded: Mutex<Vec<String>>,
    }

    impl TreeService {
        /// Complete tree: `depth` levels of `branching` children below `root`.
        fn synthetic(root: &str, depth: usize, branching: usize) -> Self {
            let mut service = Self::default();
            let mut level = vec![root.to_string()];
            for _ in 0..depth {
                let mut next = Vec::new();
                for parent in &level {
                    for i in 0..branching {
                        let child = format!("{}_{}", parent, i);
                        service.add(parent, &child, &child);
                        next.push(child);
                    }
                }
                level = next;
            }
            service
        }

        fn add(&mut self, parent: &str, child: &str, label: &str) {
            self.children
                .entry(parent.to_string())
                .or_default()
                .push((child.to_string(), label.to_string()));
        }

        fn expanded(&self) -> Vec<String> {
            let mut expanded = self.expanded.lock().unwrap().clone();
            expanded.sort();
            expanded
        }
    }

    #[async_trait]
    impl QueryService for TreeService {
        async fn execute(&self, query: &str) -> FetchResult<Vec<Binding>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut rows = Vec::new();
            for parent in sparql::values_of(query, "parent") {
                self.expanded.lock().unwrap().push(parent.to_string());
                for (child, label) in self.children.get(parent).into_iter().flatten() {
                    rows.push(Binding::from_pairs([
                        ("child", format!("http://www.wikidata.org/entity/{}", child)),
                        ("childLabel", label.clone()),
                        ("parent", format!("http://www.wikidata.org/entity/{}", parent)),
                        ("parentLabel", parent.to_string()),
                    ]));
                }
            }
            // Reverse so processing order never depends on row order.
            rows.reverse();
            Ok(rows)
        }
    }

    fn client(service: Arc<TreeService>) -> QueryClient {
        QueryClient::new(service)
    }

    #[tokio::test]
    async fn test_visits_every_node_once() {
        let service = Arc::new(TreeService::synthetic("R", 3, 3));
        let client = client(service.clone());
        let mut db = Database::in_memory().unwrap();
        let conn = db.conn_mut();

        let discovery = HierarchyDiscoverer::new(&client, 3, 4, "en")
            .discover(conn, "R")
            .await
            .unwrap();

        // 3 + 9 + 27 nodes below the seed.
        assert_eq!(discovery.pairs, 39);
        assert_eq!(discovery.visited, 40);
        assert_eq!(discovery.frontier_sizes, vec![1, 3, 9]);

        // Only levels 0..3 are expanded, each node exactly once.
        let expanded = service.expanded();
        let unique: HashSet<_> = expanded.iter().collect();
        assert_eq!(expanded.len(), 13);
        assert_eq!(unique.len(), 13);
        assert!(expanded.iter().all(|id| id.matches('_').count() < 3));

        // Batches of 4: 1 + 1 + 3 queries.
        assert_eq!(service.queries.load(Ordering::SeqCst), 5);

        let leaf = get_region(conn, "R_2_1_0").unwrap();
        assert_eq!(leaf.parent_id.as_deref(), Some("R_2_1"));
        assert_eq!(leaf.path, None);
    }

    #[tokio::test]
    async fn test_max_depth_limits_expansion() {
        let service = Arc::new(TreeService::synthetic("R", 4, 2));
        let client = client(service.clone());
        let mut db = Database::in_memory().unwrap();

        let discovery = HierarchyDiscoverer::new(&client, 2, 40, "en")
            .discover(db.conn_mut(), "R")
            .await
            .unwrap();

        assert_eq!(discovery.depth(), 2);
        assert_eq!(discovery.pairs, 2 + 4);
        assert_eq!(service.expanded(), vec!["R", "R_0", "R_1"]);
        assert!(get_region(db.conn_mut(), "R_0_0_0").is_err());
    }

    #[tokio::test]
    async fn test_back_edges_terminate() {
        let mut service = TreeService::default();
        service.add("R", "A", "A");
        service.add("A", "B", "B");
        service.add("B", "A", "A");
        service.add("B", "B", "B");
        let service = Arc::new(service);
        let client = client(service.clone());
        let mut db = Database::in_memory().unwrap();

        let discovery = HierarchyDiscoverer::new(&client, 10, 40, "en")
            .discover(db.conn_mut(), "R")
            .await
            .unwrap();

        assert_eq!(discovery.visited, 3);
        assert_eq!(discovery.depth(), 3);
        assert_eq!(service.expanded(), vec!["A", "B", "R"]);
        // The later discovery wins.
        assert_eq!(get_region(db.conn_mut(), "A").unwrap().parent_id.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_same_name_siblings_are_disambiguated() {
        let mut service = TreeService::default();
        service.add("R", "Q1", "Springfield");
        service.add("R", "Q2", "Springfield");
        let client = client(Arc::new(service));
        let mut db = Database::in_memory().unwrap();
        let conn = db.conn_mut();

        let discovery = HierarchyDiscoverer::new(&client, 1, 40, "en")
            .discover(conn, "R")
            .await
            .unwrap();

        assert_eq!(discovery.collisions, 1);
        assert_eq!(get_region(conn, "Q1").unwrap().name, "Springfield");
        assert_eq!(get_region(conn, "Q2").unwrap().name, "Springfield [Q2]");
        assert_eq!(get_region(conn, "Q2").unwrap().parent_id.as_deref(), Some("R"));
    }
}
