//! Language stages: languoids with their codes, then classification parents.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, warn};

use atlas_core::model::entity_id;
use atlas_core::{parent_map, resolve_path, LanguageLevel, PathCache, SyncConfig};
use atlas_db::queries::languages::{ensure_language_exists, upsert_language};
use atlas_db::queries::parents::set_parent;
use atlas_db::queries::sources::{add_source, SourceRecord};
use atlas_db::{EntityKind, MergeOutcome};

use crate::binding::Binding;
use crate::client::QueryClient;
use crate::sparql;

/// Result field -> provenance source name for external language codes.
const CODE_SOURCES: &[(&str, &str)] = &[
    ("iso1", "iso_639_1"),
    ("iso2", "iso_639_2"),
    ("iso3", "iso_639_3"),
    ("gl", "glottolog"),
    ("ls", "linguasphere"),
    ("ietf", "ietf"),
    ("wm", "wikimedia_language_code"),
];

/// Counts from [`sync_languages`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageSync {
    pub languages: usize,
    /// Provenance rows inserted.
    pub sources: usize,
    pub collisions: usize,
}

/// Counts from [`assign_language_parents`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParentAssignment {
    /// Distinct (child, parent) edges reported.
    pub edges: usize,
    /// Languages whose parent and path were written.
    pub assigned: usize,
    /// Languages made roots to break a parent cycle.
    pub cut: usize,
    pub collisions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct LanguageRow<'r> {
    id: &'r str,
    class: &'r str,
    name: &'r str,
    binding: usize,
}

fn source_url(source: &str, code: &str) -> Option<String> {
    match source {
        "glottolog" => Some(format!("https://glottolog.org/resource/languoid/id/{}", code)),
        "iso_639_3" => Some(format!("https://iso639-3.sil.org/code/{}", code)),
        _ => None,
    }
}

fn record_sources(conn: &Connection, id: &str, row: &Binding) -> Result<usize> {
    let mut inserted = 0;
    if add_source(conn, EntityKind::Language, id, &SourceRecord::wikidata(id))? {
        inserted += 1;
    }
    for (field, source) in CODE_SOURCES {
        let Some(code) = row.get(field).map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let mut record = SourceRecord::new(*source, code);
        if let Some(url) = source_url(source, code) {
            record = record.with_url(url);
        }
        if add_source(conn, EntityKind::Language, id, &record)? {
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// Upsert every language, family and dialect with its provenance.
///
/// Parent and path are left alone here; [`assign_language_parents`] sets
/// them once the whole classification graph is known.
pub async fn sync_languages(conn: &Connection, client: &QueryClient, config: &SyncConfig) -> Result<LanguageSync> {
    let lang = config.label_language.as_str();
    let tag = format!("languages_{}", lang);
    let bindings = client
        .fetch_paged(sparql::LANGUAGES_PAGE, Some(tag.as_str()), |page| sparql::languages(lang, page))
        .await
        .context("Failed to fetch languages")?;

    let mut rows: Vec<LanguageRow<'_>> = bindings
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let id = row.id("l")?;
            Some(LanguageRow {
                id,
                class: row.get("inst").map(entity_id).unwrap_or_default(),
                name: row.label("lLabel", id),
                binding: i,
            })
        })
        .collect();
    rows.sort();

    let mut result = LanguageSync::default();
    let mut last_id: Option<&str> = None;
    for row in &rows {
        let level = LanguageLevel::from_class(row.class);
        let outcome = upsert_language(conn, row.id, row.name, level.as_str())
            .into_result()
            .with_context(|| format!("Failed to upsert language {}", row.id))?;
        if outcome.is_collision() {
            result.collisions += 1;
        }
        result.sources += record_sources(conn, row.id, &bindings[row.binding])
            .with_context(|| format!("Failed to record sources for {}", row.id))?;

        if last_id != Some(row.id) {
            result.languages += 1;
            last_id = Some(row.id);
        }
        debug!(id = row.id, level = level.as_str(), "Language");
    }
    Ok(result)
}

/// Attach every language to its classification parent and give it the path
/// resolved from the full edge list.
pub async fn assign_language_parents(
    conn: &Connection,
    client: &QueryClient,
    config: &SyncConfig,
) -> Result<ParentAssignment> {
    let lang = config.label_language.as_str();
    let tag = format!("language_parents_{}", lang);
    let bindings = client
        .fetch_paged(sparql::LANGUAGE_PARENTS_PAGE, Some(tag.as_str()), |page| sparql::language_parents(lang, page))
        .await
        .context("Failed to fetch language classification")?;

    let mut edges: Vec<(&str, &str, &str, &str)> = bindings
        .iter()
        .filter_map(|row| {
            let child = row.id("l")?;
            let parent = row.id("parent")?;
            Some((child, parent, row.label("lLabel", child), row.label("parentLabel", parent)))
        })
        .filter(|(child, parent, _, _)| child != parent)
        .collect();
    edges.sort();
    edges.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);

    for (child, parent, child_name, parent_name) in &edges {
        ensure_language_exists(conn, parent, parent_name)?;
        ensure_language_exists(conn, child, child_name)?;
    }

    let parents = parent_map(edges.iter().map(|(child, parent, _, _)| (*child, *parent)));
    let mut children: Vec<&String> = parents.keys().collect();
    children.sort();

    let mut result = ParentAssignment {
        edges: edges.len(),
        ..Default::default()
    };
    let mut cache = PathCache::new();
    for child in children {
        let path = resolve_path(child, &parents, &mut cache);
        let outcome = if path == *child {
            // The chain above this language loops back to it.
            warn!(id = %child, "Classification cycle, treating language as a root");
            result.cut += 1;
            set_parent(conn, EntityKind::Language, child, None, Some(&path))
        } else {
            set_parent(conn, EntityKind::Language, child, parents.get(child).map(String::as_str), Some(&path))
        };
        match outcome {
            MergeOutcome::Applied => {}
            MergeOutcome::CollisionRecovered { .. } => result.collisions += 1,
            MergeOutcome::Failed(e) => {
                return Err(e).with_context(|| format!("Failed to set parent of language {}", child))
            }
        }
        result.assigned += 1;
    }
    Ok(result)
}
