//! Graph query service: the trait the client talks to, the SPARQL HTTP
//! endpoint, and an offline stand-in.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::binding::Binding;
use crate::error::{FetchError, FetchResult};

/// Default public endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Default user agent; public endpoints ask clients to identify themselves.
pub const DEFAULT_USER_AGENT: &str = concat!("atlas/", env!("CARGO_PKG_VERSION"), " (knowledge graph sync)");

/// Connection settings for the graph query service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Anything that can answer a graph query with rows of bindings.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn execute(&self, query: &str) -> FetchResult<Vec<Binding>>;
}

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

/// SPARQL 1.1 protocol endpoint returning JSON results.
#[derive(Clone)]
pub struct SparqlEndpoint {
    url: String,
    client: reqwest::Client,
}

impl SparqlEndpoint {
    pub fn new(config: &EndpointConfig) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QueryService for SparqlEndpoint {
    async fn execute(&self, query: &str) -> FetchResult<Vec<Binding>> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        let parsed: SparqlResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        debug!(rows = parsed.results.bindings.len(), "Query answered");
        Ok(parsed.results.bindings)
    }
}

/// Refuses every query. Used for cache-only replay.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineService;

#[async_trait]
impl QueryService for OfflineService {
    async fn execute(&self, query: &str) -> FetchResult<Vec<Binding>> {
        let head = query.lines().next().unwrap_or_default().trim();
        Err(FetchError::Offline(head.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results_document() {
        let body = r#"{
            "head": {"vars": ["c", "cLabel"]},
            "results": {"bindings": [
                {"c": {"type": "uri", "value": "http://www.wikidata.org/entity/Q142"},
                 "cLabel": {"type": "literal", "value": "France"}}
            ]}
        }"#;
        let parsed: SparqlResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.results.bindings.len(), 1);
        assert_eq!(parsed.results.bindings[0].id("c"), Some("Q142"));
    }

    #[test]
    fn test_endpoint_builds_from_defaults() {
        let endpoint = SparqlEndpoint::new(&EndpointConfig::default()).unwrap();
        assert_eq!(endpoint.url(), DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn test_offline_service_refuses() {
        let err = OfflineService.execute("#atlas:countries\nSELECT").await.unwrap_err();
        assert!(matches!(err, FetchError::Offline(ref head) if head == "#atlas:countries"));
        assert!(!err.is_transient());
    }
}
