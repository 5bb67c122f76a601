//! Domain vocabulary shared by the sync pipeline and the store.

use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, AtlasResult};

/// Wikidata class for language families.
pub const LANGUAGE_FAMILY_CLASS: &str = "Q25295";

/// Wikidata class for dialects.
pub const DIALECT_CLASS: &str = "Q33384";

/// Wikidata class for languages.
pub const LANGUAGE_CLASS: &str = "Q34770";

/// Classification level of a language entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageLevel {
    Family,
    Language,
    Dialect,
}

impl LanguageLevel {
    /// Level for an upstream instance-of class. Anything that is not a
    /// family or a dialect is treated as a language.
    pub fn from_class(class_id: &str) -> Self {
        match class_id {
            LANGUAGE_FAMILY_CLASS => Self::Family,
            DIALECT_CLASS => Self::Dialect,
            _ => Self::Language,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Language => "language",
            Self::Dialect => "dialect",
        }
    }
}

/// How a language relates to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Official,
    Used,
}

impl RelationKind {
    /// Parse from string.
    pub fn parse(s: &str) -> AtlasResult<Self> {
        match s.to_lowercase().as_str() {
            "official" => Ok(Self::Official),
            "used" => Ok(Self::Used),
            other => Err(AtlasError::UnknownRelation(other.to_string())),
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Official => "official",
            Self::Used => "used",
        }
    }
}

/// Reduce an entity URI to its id: `http://www.wikidata.org/entity/Q30` -> `Q30`.
pub fn entity_id(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_class() {
        assert_eq!(LanguageLevel::from_class("Q25295"), LanguageLevel::Family);
        assert_eq!(LanguageLevel::from_class("Q33384"), LanguageLevel::Dialect);
        assert_eq!(LanguageLevel::from_class(LANGUAGE_CLASS), LanguageLevel::Language);
        assert_eq!(LanguageLevel::from_class("Q1288568"), LanguageLevel::Language);
    }

    #[test]
    fn test_relation_parse() {
        assert_eq!(RelationKind::parse("Official").unwrap(), RelationKind::Official);
        assert_eq!(RelationKind::parse("used").unwrap(), RelationKind::Used);
        assert!(RelationKind::parse("spoken").is_err());
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(entity_id("http://www.wikidata.org/entity/Q30"), "Q30");
        assert_eq!(entity_id("Q30"), "Q30");
        assert_eq!(entity_id(""), "");
    }
}
