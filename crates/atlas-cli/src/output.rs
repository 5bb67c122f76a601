//! Terminal output formatting.

use colored::{ColoredString, Colorize};

use atlas_db::queries::paths::PathRecompute;
use atlas_db::EntityKind;
use atlas_graph::{CacheInfo, SyncReport};

/// Print the counts of a finished sync run.
pub fn print_sync_report(report: &SyncReport) {
    println!("\n{}", "Sync complete:".green().bold());
    println!("  Top-level regions:   {}", report.top_level);
    if report.seeds > 0 {
        println!(
            "  Subregion pairs:     {} ({} regions from {} seeds)",
            report.subregion_pairs, report.regions_visited, report.seeds
        );
    }
    println!("  Languages:           {} ({} sources)", report.languages, report.language_sources);
    println!("  Language parents:    {}", report.language_parents);
    println!("  Relations:           {}", report.relations);
    println!("  Aliases added:       {}", report.aliases);
    println!("  Collisions resolved: {}", highlight_nonzero(report.collisions));
    println!(
        "  Paths updated:       {} regions, {} languages",
        report.region_paths.updated, report.language_paths.updated
    );

    let unresolved = report.region_paths.cleared + report.language_paths.cleared;
    if unresolved > 0 {
        println!("  {} {} path(s) cleared, not reachable from a root", "!".yellow().bold(), unresolved);
    }
    if !report.skipped.is_empty() {
        let names: Vec<&str> = report.skipped.iter().map(|s| s.as_str()).collect();
        println!("  Skipped:             {}", names.join(", ").dimmed());
    }
    println!(
        "  Requests:            {} ({} from cache)",
        report.requests,
        report.cache_hits.to_string().dimmed()
    );
}

pub fn print_path_recompute(label: &str, result: &PathRecompute) {
    println!(
        "  {:<10} {} resolved, {} updated, {} cleared",
        label.bold(),
        result.resolved,
        result.updated,
        highlight_nonzero(result.cleared)
    );
}

/// Print table counts and entities still missing a path.
pub fn print_status(counts: &[(&str, i64)], missing: &[(EntityKind, i64)]) {
    println!("{:<26} {:>10}", "Table", "Rows");
    println!("{}", "─".repeat(37));
    for (table, count) in counts {
        let count = if *count == 0 {
            count.to_string().dimmed()
        } else {
            count.to_string().normal()
        };
        println!("{:<26} {:>10}", table, count);
    }

    println!();
    for (kind, count) in missing {
        println!("{:<26} {:>10}", format!("{} without path", kind), highlight_nonzero(*count as usize));
    }
}

/// Print cached query results as a table.
pub fn print_cache_table(entries: &[CacheInfo]) {
    if entries.is_empty() {
        println!("{}", "No cached queries.".dimmed());
        return;
    }

    println!("{:<44} {:>8} {:>10}  {}", "Tag", "Rows", "Size", "Fetched");
    println!("{}", "─".repeat(85));

    let mut total = 0;
    for entry in entries {
        total += entry.bytes;
        let fetched = entry
            .fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<44} {:>8} {:>10}  {}",
            truncate(&entry.tag, 42).cyan(),
            entry.rows,
            human_bytes(entry.bytes),
            fetched.dimmed()
        );
    }

    println!("\n{} entries, {}", entries.len().to_string().bold(), human_bytes(total));
}

fn highlight_nonzero(n: usize) -> ColoredString {
    if n == 0 {
        n.to_string().normal()
    } else {
        n.to_string().yellow()
    }
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("countries_en", 20), "countries_en");
        assert_eq!(truncate("subregions_en_0123456789abcdef", 12), "subregions_…");
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
