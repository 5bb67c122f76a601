//! Query client: cache lookup, throttling, retry with backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::binding::Binding;
use crate::cache::QueryCache;
use crate::error::{FetchError, FetchResult};
use crate::endpoint::QueryService;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::sparql::Page;

fn page_tag(tag: &str, index: usize) -> String {
    if index == 0 {
        tag.to_string()
    } else {
        format!("{}_p{}", tag, index)
    }
}

/// Request counters for one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Attempts sent to the query service, retries included.
    pub requests: usize,
    /// Queries answered from the cache.
    pub cache_hits: usize,
}

/// Client for the graph query service.
pub struct QueryClient {
    service: Arc<dyn QueryService>,
    cache: Option<QueryCache>,
    policy: RetryPolicy,
    throttle: Duration,
    sleeper: Arc<dyn Sleeper>,
    requests: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl QueryClient {
    /// Client without cache, default retry policy and no throttle.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self {
            service,
            cache: None,
            policy: RetryPolicy::default(),
            throttle: Duration::ZERO,
            sleeper: Arc::new(TokioSleeper),
            requests: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delay applied before every attempt, the first one included.
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Run `query`, answering from the cache when `tag` has an entry.
    ///
    /// Fresh results are cached under `tag` before they are returned.
    pub async fn fetch(&self, query: &str, tag: Option<&str>) -> FetchResult<Vec<Binding>> {
        if let (Some(cache), Some(tag)) = (&self.cache, tag) {
            if let Some(rows) = cache.load(tag)? {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(rows);
            }
        }

        let rows = self.fetch_with_retry(query, tag).await?;

        if let (Some(cache), Some(tag)) = (&self.cache, tag) {
            cache.store(tag, &rows)?;
        }
        Ok(rows)
    }

    /// Run an ordered query page by page until a page comes back short.
    ///
    /// `build` renders the query for one page. The first page is cached
    /// under `tag`, page `n` under `<tag>_p<n>`.
    pub async fn fetch_paged<F>(&self, page_size: usize, tag: Option<&str>, build: F) -> FetchResult<Vec<Binding>>
    where
        F: Fn(Page) -> String,
    {
        let page_size = page_size.max(1);
        let mut rows = Vec::new();
        let mut index = 0;
        loop {
            let page_tag = tag.map(|tag| page_tag(tag, index));
            let page = self.fetch(&build(Page::nth(index, page_size)), page_tag.as_deref()).await?;
            let full = page.len() >= page_size;
            rows.extend(page);
            if !full {
                break;
            }
            index += 1;
            debug!(tag = tag.unwrap_or("-"), page = index, rows = rows.len(), "Full page, fetching the next one");
        }
        Ok(rows)
    }

    async fn fetch_with_retry(&self, query: &str, tag: Option<&str>) -> FetchResult<Vec<Binding>> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            if !self.throttle.is_zero() {
                self.sleeper.sleep(self.throttle).await;
            }
            self.requests.fetch_add(1, Ordering::Relaxed);

            match self.service.execute(query).await {
                Ok(rows) => {
                    debug!(tag = tag.unwrap_or("-"), attempt, rows = rows.len(), "Fetched");
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        tag = tag.unwrap_or("-"),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient query failure, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(FetchError::Offline(head)) => {
                    return Err(FetchError::Offline(tag.map(str::to_string).unwrap_or(head)));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
