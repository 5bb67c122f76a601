//! Centralized error types for atlas.

use thiserror::Error;

/// Main error type for atlas domain operations.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown relation kind: {0}")]
    UnknownRelation(String),
}

/// Result type for atlas domain operations.
pub type AtlasResult<T> = Result<T, AtlasError>;

impl AtlasError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
