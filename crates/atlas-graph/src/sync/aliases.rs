//! Alias enrichment over the entities already in the store.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use atlas_core::SyncConfig;
use atlas_db::queries::aliases::insert_alias;
use atlas_db::queries::list_ids;
use atlas_db::EntityKind;

use crate::cache::batch_tag;
use crate::client::QueryClient;
use crate::sparql;

/// Fetch alternative labels for every stored region and language; returns
/// the number of aliases inserted.
pub async fn sync_aliases(conn: &Connection, client: &QueryClient, config: &SyncConfig) -> Result<usize> {
    let mut inserted = 0;
    for kind in [EntityKind::Region, EntityKind::Language] {
        inserted += sync_kind(conn, client, config, kind)
            .await
            .with_context(|| format!("Failed to sync {} aliases", kind))?;
    }
    Ok(inserted)
}

async fn sync_kind(conn: &Connection, client: &QueryClient, config: &SyncConfig, kind: EntityKind) -> Result<usize> {
    let lang = config.label_language.as_str();
    let ids: Vec<String> = list_ids(conn, kind)?
        .into_iter()
        .filter(|id| sparql::is_item_id(id))
        .collect();

    let mut inserted = 0;
    for batch in ids.chunks(config.alias_batch_size.max(1)) {
        let members: HashSet<&str> = batch.iter().map(String::as_str).collect();
        let tag = batch_tag(&format!("{}_aliases_{}", kind, lang), batch);
        let rows = client
            .fetch(&sparql::aliases(batch, lang), Some(tag.as_str()))
            .await
            .with_context(|| format!("Failed to fetch aliases (batch {})", tag))?;

        let mut pairs: Vec<(&str, &str)> = rows
            .iter()
            .filter_map(|row| Some((row.id("item")?, row.get("alias")?.trim())))
            .filter(|(id, alias)| !alias.is_empty() && members.contains(id))
            .collect();
        pairs.sort();
        pairs.dedup();

        for (id, alias) in pairs {
            if insert_alias(conn, kind, id, alias)? {
                inserted += 1;
            }
        }
        debug!(%kind, batch = batch.len(), tag = %tag, "Alias batch done");
    }
    Ok(inserted)
}
