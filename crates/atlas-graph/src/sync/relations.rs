//! Language-region relations (official / used).

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, warn};

use atlas_core::{RelationKind, SyncConfig};
use atlas_db::queries::languages::ensure_language_exists;
use atlas_db::queries::regions::ensure_region_under;
use atlas_db::queries::relations::link_language_region;

use crate::client::QueryClient;
use crate::sparql;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Link<'r> {
    language: &'r str,
    region: &'r str,
    /// Sorts `used` before `official`, so an official link reported in the
    /// same run is the one that sticks.
    official: bool,
    language_name: &'r str,
    region_name: &'r str,
}

/// Counts from [`sync_relations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationSync {
    /// Links written.
    pub links: usize,
    /// Regions first seen here, inserted under the root.
    pub regions_added: usize,
    pub collisions: usize,
}

/// Link languages to regions.
///
/// Either end may not have been seen by an earlier stage, so both are
/// ensured to exist first. A missing region goes directly under the root.
pub async fn sync_relations(conn: &Connection, client: &QueryClient, config: &SyncConfig) -> Result<RelationSync> {
    let lang = config.label_language.as_str();
    let tag = format!("language_regions_{}", lang);
    let bindings = client
        .fetch_paged(sparql::LANGUAGE_REGIONS_PAGE, Some(tag.as_str()), |page| sparql::language_regions(lang, page))
        .await
        .context("Failed to fetch language-region relations")?;

    let mut links: Vec<Link<'_>> = Vec::with_capacity(bindings.len());
    for row in &bindings {
        let (Some(region), Some(language)) = (row.id("c"), row.id("l")) else {
            continue;
        };
        let kind = match row.get("rel").map(RelationKind::parse) {
            Some(Ok(kind)) => kind,
            other => {
                warn!(language, region, relation = ?other, "Unknown relation kind, skipping");
                continue;
            }
        };
        links.push(Link {
            language,
            region,
            official: kind == RelationKind::Official,
            language_name: row.label("lLabel", language),
            region_name: row.label("cLabel", region),
        });
    }
    links.sort();
    links.dedup_by(|a, b| a.language == b.language && a.region == b.region && a.official == b.official);

    let mut result = RelationSync {
        links: links.len(),
        ..Default::default()
    };
    for link in &links {
        ensure_language_exists(conn, link.language, link.language_name)?;
        if let Some(outcome) = ensure_region_under(conn, link.region, link.region_name, &config.root_id)
            .with_context(|| format!("Failed to insert region {}", link.region))?
        {
            result.regions_added += 1;
            if outcome.is_collision() {
                result.collisions += 1;
            }
        }
        let kind = if link.official {
            RelationKind::Official
        } else {
            RelationKind::Used
        };
        link_language_region(conn, link.language, link.region, kind.as_str())
            .with_context(|| format!("Failed to link {} to {}", link.language, link.region))?;
        debug!(language = link.language, region = link.region, relation = kind.as_str(), "Linked");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use atlas_db::queries::regions::get_region;
    use atlas_db::queries::relations::list_language_regions;
    use atlas_db::Database;

    use crate::binding::Binding;
    use crate::endpoint::QueryService;
    use crate::error::FetchResult;
    use crate::sync::regions::bootstrap_root;

    struct Links(Vec<Binding>);

    #[async_trait]
    impl QueryService for Links {
        async fn execute(&self, _query: &str) -> FetchResult<Vec<Binding>> {
            Ok(self.0.clone())
        }
    }

    fn link(region: &str, language: &str, rel: &str) -> Binding {
        Binding::from_pairs([
            ("c", region),
            ("cLabel", "Belgium"),
            ("l", language),
            ("lLabel", "French"),
            ("rel", rel),
        ])
    }

    #[tokio::test]
    async fn test_official_wins_within_a_run() {
        let client = QueryClient::new(Arc::new(Links(vec![
            link("Q31", "Q150", "official"),
            link("Q31", "Q150", "used"),
            link("Q31", "Q150", "sacred"),
        ])));
        let mut db = Database::in_memory().unwrap();
        let conn = db.conn_mut();
        let config = SyncConfig::default();
        bootstrap_root(conn, &config).unwrap();

        let result = sync_relations(conn, &client, &config).await.unwrap();
        assert_eq!(result.links, 2);
        assert_eq!(result.regions_added, 1);

        let rows = list_language_regions(conn, "Q150").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].relation, "official");

        // The missing region hangs off the root rather than becoming one.
        let region = get_region(conn, "Q31").unwrap();
        assert_eq!(region.name, "Belgium");
        assert_eq!(region.parent_id.as_deref(), Some("world"));
        assert_eq!(region.path.as_deref(), Some("world.Q31"));
    }
}
