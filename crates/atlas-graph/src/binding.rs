//! Result rows from the graph query service.
//!
//! A binding maps field names to optional scalar values. Fresh SPARQL JSON
//! results carry each value as a term object (`{"type": "uri", "value":
//! "..."}`); flattened cache files may carry a plain string. [`Binding::get`]
//! reads both shapes the same way.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use atlas_core::model::entity_id;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Binding(Map<String, Value>);

impl Binding {
    /// Build a binding of literal terms, as the query service would return.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| {
                let term = serde_json::json!({ "type": "literal", "value": v.into() });
                (k.into(), term)
            })
            .collect();
        Self(map)
    }

    /// Scalar value of `field`, or `None` when unbound.
    pub fn get(&self, field: &str) -> Option<&str> {
        match self.0.get(field)? {
            Value::Object(term) => term.get("value").and_then(Value::as_str),
            Value::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Entity id bound to `field`, with any URI prefix stripped.
    pub fn id(&self, field: &str) -> Option<&str> {
        self.get(field).map(entity_id).filter(|id| !id.is_empty())
    }

    /// Label bound to `field`, falling back to `fallback` when unbound or empty.
    pub fn label<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
        self.get(field).filter(|s| !s.trim().is_empty()).unwrap_or(fallback)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_and_flattened_shapes_read_the_same() {
        let fresh: Binding = serde_json::from_str(
            r#"{"c": {"type": "uri", "value": "http://www.wikidata.org/entity/Q30"},
                "cLabel": {"type": "literal", "xml:lang": "en", "value": "United States"}}"#,
        )
        .unwrap();
        let flattened: Binding = serde_json::from_str(
            r#"{"c": "http://www.wikidata.org/entity/Q30", "cLabel": "United States"}"#,
        )
        .unwrap();

        for binding in [&fresh, &flattened] {
            assert_eq!(binding.id("c"), Some("Q30"));
            assert_eq!(binding.get("cLabel"), Some("United States"));
            assert_eq!(binding.get("a2"), None);
        }
    }

    #[test]
    fn test_label_fallback() {
        let binding = Binding::from_pairs([("l", "Q1"), ("lLabel", "  ")]);
        assert_eq!(binding.label("lLabel", "Q1"), "Q1");
        assert_eq!(binding.label("missing", "Q1"), "Q1");
    }

    #[test]
    fn test_non_scalar_is_unbound() {
        let binding: Binding = serde_json::from_str(r#"{"x": [1, 2], "y": null}"#).unwrap();
        assert_eq!(binding.get("x"), None);
        assert_eq!(binding.get("y"), None);
    }

    #[test]
    fn test_serialization_round_trip_keeps_shape() {
        let binding = Binding::from_pairs([("c", "Q1")]);
        let json = serde_json::to_string(&binding).unwrap();
        assert!(json.contains(r#""value":"Q1""#));
    }
}
