//! Region stages: root bootstrap, top-level regions, hierarchy discovery.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, warn};

use atlas_core::SyncConfig;
use atlas_db::queries::exists;
use atlas_db::queries::regions::{find_regions_by_alpha2, upsert_region, RegionRecord};
use atlas_db::EntityKind;

use crate::client::QueryClient;
use crate::hierarchy::{Discovery, HierarchyDiscoverer};
use crate::sparql;

/// Top-level regions written by [`sync_top_level`].
#[derive(Debug, Clone, Default)]
pub struct TopLevel {
    /// Ids, sorted.
    pub ids: Vec<String>,
    pub collisions: usize,
}

/// One country row, normalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CountryRow {
    id: String,
    name: String,
    alpha2: Option<String>,
    alpha3: Option<String>,
}

/// Create or refresh the sentinel root region.
pub fn bootstrap_root(conn: &Connection, config: &SyncConfig) -> Result<()> {
    let record = RegionRecord {
        id: config.root_id.as_str(),
        name: config.root_name.as_str(),
        path: Some(config.root_id.as_str()),
        ..Default::default()
    };
    upsert_region(conn, &record).into_result()?;
    Ok(())
}

/// Upsert every top-level region directly under the root.
pub async fn sync_top_level(conn: &Connection, client: &QueryClient, config: &SyncConfig) -> Result<TopLevel> {
    let lang = config.label_language.as_str();
    let tag = format!("countries_{}", lang);
    let rows = client
        .fetch_paged(sparql::COUNTRIES_PAGE, Some(tag.as_str()), |page| sparql::countries(lang, page))
        .await
        .context("Failed to fetch countries")?;

    let mut countries: Vec<CountryRow> = rows
        .iter()
        .filter_map(|row| {
            let id = row.id("c")?;
            Some(CountryRow {
                id: id.to_string(),
                name: row.label("cLabel", id).to_string(),
                alpha2: row.get("a2").map(str::to_string),
                alpha3: row.get("a3").map(str::to_string),
            })
        })
        .collect();
    countries.sort();
    countries.dedup();

    let mut top_level = TopLevel::default();
    for country in &countries {
        if country.id == config.root_id {
            warn!(id = %country.id, "Top-level region shares the root id, skipping");
            continue;
        }
        let path = format!("{}.{}", config.root_id, country.id);
        let record = RegionRecord {
            id: country.id.as_str(),
            name: country.name.as_str(),
            parent_id: Some(config.root_id.as_str()),
            path: Some(path.as_str()),
            iso_alpha2: country.alpha2.as_deref(),
            iso_alpha3: country.alpha3.as_deref(),
            wikidata_id: Some(country.id.as_str()),
        };
        let outcome = upsert_region(conn, &record)
            .into_result()
            .with_context(|| format!("Failed to upsert region {}", country.id))?;
        if outcome.is_collision() {
            top_level.collisions += 1;
        }
        debug!(id = %country.id, name = %country.name, "Top-level region");
        top_level.ids.push(country.id.clone());
    }
    top_level.ids.dedup();
    Ok(top_level)
}

/// Regions to expand: every top-level region, or the configured seeds
/// resolved by id or ISO alpha-2 code.
pub fn select_seeds(conn: &Connection, config: &SyncConfig, top_level: &[String]) -> Result<Vec<String>> {
    if config.seeds.is_empty() {
        return Ok(top_level.to_vec());
    }

    let mut seeds: Vec<String> = Vec::new();
    for wanted in &config.seeds {
        let resolved = if exists(conn, EntityKind::Region, wanted)? {
            vec![wanted.clone()]
        } else {
            find_regions_by_alpha2(conn, std::slice::from_ref(wanted))?
        };
        if resolved.is_empty() {
            warn!(seed = %wanted, "Unknown seed region, skipping");
        }
        for id in resolved {
            if !seeds.contains(&id) {
                seeds.push(id);
            }
        }
    }
    Ok(seeds)
}

/// Expand each seed independently.
pub async fn discover_hierarchy(
    conn: &Connection,
    client: &QueryClient,
    config: &SyncConfig,
    seeds: &[String],
) -> Result<Vec<Discovery>> {
    let discoverer = HierarchyDiscoverer::new(client, config.max_depth, config.batch_size, &config.label_language);
    let mut discoveries = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let discovery = discoverer
            .discover(conn, seed)
            .await
            .with_context(|| format!("Failed to expand seed {}", seed))?;
        discoveries.push(discovery);
    }
    Ok(discoveries)
}
