//! SPARQL query builders for the Wikidata graph.
//!
//! Every query starts with an `#atlas:<kind>` comment line naming what it
//! asks for. The endpoint ignores it; logs and scripted test services read
//! it back with [`query_kind`].

use atlas_core::model::{DIALECT_CLASS, LANGUAGE_CLASS, LANGUAGE_FAMILY_CLASS};

/// Instance-of class for sovereign countries.
pub const COUNTRY_CLASS: &str = "Q6256";

/// Query kinds, as written in the header line.
pub const COUNTRIES: &str = "countries";
pub const LANGUAGES: &str = "languages";
pub const LANGUAGE_PARENTS: &str = "language_parents";
pub const LANGUAGE_REGIONS: &str = "language_regions";
pub const SUBREGIONS: &str = "subregions";
pub const ALIASES: &str = "aliases";

/// Rows per page for the unbatched queries. A page that comes back full
/// means there may be more.
pub const COUNTRIES_PAGE: usize = 2500;
pub const LANGUAGES_PAGE: usize = 10000;
pub const LANGUAGE_PARENTS_PAGE: usize = 20000;
pub const LANGUAGE_REGIONS_PAGE: usize = 20000;

/// One `LIMIT`/`OFFSET` window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    /// The `index`-th page of `limit` rows.
    pub fn nth(index: usize, limit: usize) -> Self {
        Self {
            limit,
            offset: index * limit,
        }
    }

    fn clause(&self) -> String {
        format!("LIMIT {}\nOFFSET {}\n", self.limit, self.offset)
    }
}

fn header(kind: &str) -> String {
    format!("#atlas:{}\n", kind)
}

fn label_service(lang: &str) -> String {
    format!(
        "  SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"{}\". }}\n",
        escape_literal(lang)
    )
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `wd:` terms for `ids`. Ids that are not valid prefixed-name locals are
/// dropped since they cannot appear in a VALUES block.
fn item_values(ids: &[String]) -> String {
    ids.iter()
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
        .map(|id| format!("wd:{}", id))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `id` has the shape of a Wikidata item id (`Q` + digits).
pub fn is_item_id(id: &str) -> bool {
    id.len() > 1 && id.starts_with('Q') && id[1..].bytes().all(|b| b.is_ascii_digit())
}

/// Countries with their ISO 3166-1 codes.
///
/// Fields: `c`, `cLabel`, `a2`, `a3`.
pub fn countries(lang: &str, page: Page) -> String {
    format!(
        "{}SELECT ?c ?cLabel ?a2 ?a3 WHERE {{\n\
         \x20 ?c wdt:P31 wd:{} .\n\
         \x20 OPTIONAL {{ ?c wdt:P297 ?a2 }}\n\
         \x20 OPTIONAL {{ ?c wdt:P298 ?a3 }}\n\
         {}}}\nORDER BY ?c\n{}",
        header(COUNTRIES),
        COUNTRY_CLASS,
        label_service(lang),
        page.clause()
    )
}

/// Languages, families and dialects with their external codes.
///
/// Fields: `l`, `lLabel`, `inst`, `iso1`, `iso2`, `iso3`, `gl`, `ls`,
/// `ietf`, `wm`.
pub fn languages(lang: &str, page: Page) -> String {
    format!(
        "{}SELECT ?l ?lLabel ?inst ?iso1 ?iso2 ?iso3 ?gl ?ls ?ietf ?wm WHERE {{\n\
         \x20 VALUES ?inst {{ wd:{language} wd:{family} wd:{dialect} }}\n\
         \x20 ?l wdt:P31 ?inst .\n\
         \x20 OPTIONAL {{ ?l wdt:P218 ?iso1 }}\n\
         \x20 OPTIONAL {{ ?l wdt:P219 ?iso2 }}\n\
         \x20 OPTIONAL {{ ?l wdt:P220 ?iso3 }}\n\
         \x20 OPTIONAL {{ ?l wdt:P1394 ?gl }}\n\
         \x20 OPTIONAL {{ ?l wdt:P1396 ?ls }}\n\
         \x20 OPTIONAL {{ ?l wdt:P305 ?ietf }}\n\
         \x20 OPTIONAL {{ ?l wdt:P424 ?wm }}\n\
         {}}}\nORDER BY ?l ?inst ?iso1 ?iso2 ?iso3 ?gl ?ls ?ietf ?wm\n{}",
        header(LANGUAGES),
        label_service(lang),
        page.clause(),
        language = LANGUAGE_CLASS,
        family = LANGUAGE_FAMILY_CLASS,
        dialect = DIALECT_CLASS,
    )
}

/// Classification edges between languoids (subclass-of).
///
/// Fields: `l`, `lLabel`, `parent`, `parentLabel`.
pub fn language_parents(lang: &str, page: Page) -> String {
    format!(
        "{}SELECT ?l ?lLabel ?parent ?parentLabel WHERE {{\n\
         \x20 VALUES ?inst {{ wd:{language} wd:{family} wd:{dialect} }}\n\
         \x20 VALUES ?pinst {{ wd:{language} wd:{family} }}\n\
         \x20 ?l wdt:P31 ?inst .\n\
         \x20 ?l wdt:P279 ?parent .\n\
         \x20 ?parent wdt:P31 ?pinst .\n\
         {}}}\nORDER BY ?l ?parent\n{}",
        header(LANGUAGE_PARENTS),
        label_service(lang),
        page.clause(),
        language = LANGUAGE_CLASS,
        family = LANGUAGE_FAMILY_CLASS,
        dialect = DIALECT_CLASS,
    )
}

/// Official and used languages per country.
///
/// Fields: `c`, `cLabel`, `l`, `lLabel`, `rel`.
pub fn language_regions(lang: &str, page: Page) -> String {
    format!(
        "{}SELECT ?c ?cLabel ?l ?lLabel ?rel WHERE {{\n\
         \x20 {{\n\
         \x20   ?c wdt:P31 wd:{country} .\n\
         \x20   ?c wdt:P37 ?l .\n\
         \x20   BIND(\"official\" AS ?rel)\n\
         \x20 }} UNION {{\n\
         \x20   ?c wdt:P31 wd:{country} .\n\
         \x20   ?c wdt:P2936 ?l .\n\
         \x20   BIND(\"used\" AS ?rel)\n\
         \x20 }}\n\
         {}}}\nORDER BY ?c ?l ?rel\n{}",
        header(LANGUAGE_REGIONS),
        label_service(lang),
        page.clause(),
        country = COUNTRY_CLASS,
    )
}

/// Current administrative subdivisions directly contained by any of
/// `parents`.
///
/// Fields: `child`, `childLabel`, `parent`, `parentLabel`.
pub fn subregions(parents: &[String], lang: &str) -> String {
    format!(
        "{}SELECT ?child ?childLabel ?parent ?parentLabel WHERE {{\n\
         \x20 VALUES ?parent {{ {} }}\n\
         \x20 ?child wdt:P131 ?parent .\n\
         \x20 FILTER NOT EXISTS {{ ?child wdt:P576 ?dissolved }}\n\
         {}}}\n",
        header(SUBREGIONS),
        item_values(parents),
        label_service(lang)
    )
}

/// Alternative labels in `lang` for `ids`.
///
/// Fields: `item`, `alias`.
pub fn aliases(ids: &[String], lang: &str) -> String {
    format!(
        "{}SELECT ?item ?alias WHERE {{\n\
         \x20 VALUES ?item {{ {} }}\n\
         \x20 ?item skos:altLabel ?alias .\n\
         \x20 FILTER(LANG(?alias) = \"{}\")\n\
         }}\n",
        header(ALIASES),
        item_values(ids),
        escape_literal(lang)
    )
}

/// Kind named in a query's header line.
pub fn query_kind(query: &str) -> Option<&str> {
    query
        .lines()
        .next()
        .and_then(|line| line.trim().strip_prefix("#atlas:"))
        .map(str::trim)
}

/// The `LIMIT`/`OFFSET` window a query asks for, if any.
pub fn page_of(query: &str) -> Option<Page> {
    let number = |keyword: &str| -> Option<usize> {
        query
            .lines()
            .find_map(|line| line.trim().strip_prefix(keyword))
            .and_then(|n| n.trim().parse().ok())
    };
    Some(Page {
        limit: number("LIMIT ")?,
        offset: number("OFFSET ").unwrap_or(0),
    })
}

/// Item ids listed in a query's VALUES block over `var`.
pub fn values_of<'q>(query: &'q str, var: &str) -> Vec<&'q str> {
    let marker = format!("VALUES ?{} {{", var);
    let Some(start) = query.find(&marker) else {
        return Vec::new();
    };
    let rest = &query[start + marker.len()..];
    let end = rest.find('}').unwrap_or(rest.len());
    rest[..end]
        .split_whitespace()
        .filter_map(|term| term.strip_prefix("wd:"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_round_trip() {
        let first = Page::nth(0, 10);
        assert_eq!(query_kind(&countries("en", first)), Some(COUNTRIES));
        assert_eq!(query_kind(&languages("en", first)), Some(LANGUAGES));
        assert_eq!(query_kind(&subregions(&ids(&["Q1"]), "en")), Some(SUBREGIONS));
        assert_eq!(query_kind("SELECT 1"), None);
    }

    #[test]
    fn test_subregions_values() {
        let query = subregions(&ids(&["Q142", "Q30"]), "en");
        assert!(query.contains("VALUES ?parent { wd:Q142 wd:Q30 }"));
        assert!(query.contains("wdt:P131"));
        assert_eq!(values_of(&query, "parent"), vec!["Q142", "Q30"]);
    }

    #[test]
    fn test_invalid_ids_are_dropped() {
        let query = aliases(&ids(&["Q5", "bad id", "x}"]), "fr");
        assert_eq!(values_of(&query, "item"), vec!["Q5"]);
        assert!(query.contains("LANG(?alias) = \"fr\""));
    }

    #[test]
    fn test_label_language_escaped() {
        let query = countries("en\"} DROP", Page::nth(0, 10));
        assert!(query.contains("wikibase:language \"en\\\"} DROP\""));
    }

    #[test]
    fn test_language_classes() {
        let query = language_parents("en", Page::nth(0, 10));
        assert!(query.contains("VALUES ?inst { wd:Q34770 wd:Q25295 wd:Q33384 }"));
        assert!(query.contains("VALUES ?pinst { wd:Q34770 wd:Q25295 }"));
    }

    #[test]
    fn test_page_window() {
        let query = language_regions("en", Page::nth(2, 500));
        assert!(query.contains("ORDER BY ?c ?l ?rel\nLIMIT 500\nOFFSET 1000\n"));
        assert_eq!(page_of(&query), Some(Page { limit: 500, offset: 1000 }));
        assert_eq!(page_of(&subregions(&ids(&["Q1"]), "en")), None);
    }

    #[test]
    fn test_is_item_id() {
        assert!(is_item_id("Q142"));
        assert!(!is_item_id("Q"));
        assert!(!is_item_id("P31"));
        assert!(!is_item_id("world"));
    }
}
