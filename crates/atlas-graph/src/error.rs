//! Query client error types.

use thiserror::Error;

/// Errors raised while fetching from the graph query service.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Upstream temporarily unavailable: {0}")]
    Transient(String),

    #[error("Upstream rejected query ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    #[error("Query not cached and network access is disabled (tag: {0})")]
    Offline(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Map a non-success HTTP status. Rate limiting and gateway/service
    /// unavailability are worth retrying; everything else is final.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 | 502 | 503 | 504 => Self::Transient(format!("HTTP {}", status)),
            _ => Self::Rejected {
                status,
                body: body.into(),
            },
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
            Self::Transient(e.to_string())
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16(), e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}
