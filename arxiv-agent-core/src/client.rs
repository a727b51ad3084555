//! arXiv API transport.
//!
//! `ArxivClient` issues GET requests against the Atom query endpoint with a
//! per-attempt timeout, spaces consecutive requests apart, and retries only
//! connection-level failures. HTTP error statuses come back immediately.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::ArxivConfig;
use crate::error::{SearchError, TransportError};
use crate::feed::{self, FeedReport};
use crate::query::{self, ArxivQuery};
use crate::retry::{RetryConfig, with_retry};
use crate::types::{PaperRecord, SearchRequest};

/// Anything that can answer a `SearchRequest` with papers.
///
/// An `Ok` with an empty list means "no papers matched"; a transport failure
/// is always an `Err`.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<PaperRecord>, SearchError>;
}

/// HTTP client for the arXiv query API.
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    min_interval: Duration,
    retry: RetryConfig,
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ArxivClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivClient")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("min_interval", &self.min_interval)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig, retry: RetryConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::ClientBuild {
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
            min_interval: Duration::from_millis(config.min_request_interval_ms),
            retry,
            last_request: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait until `min_interval` has passed since the previous request.
    ///
    /// The lock is held across the sleep so concurrent callers queue up.
    async fn rate_limit(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(instant) = *last {
            let elapsed = instant.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limiting arXiv request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_once(&self, url: &str) -> Result<String, TransportError> {
        self.rate_limit().await;
        tracing::debug!(url, "Fetching arXiv feed");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout_secs,
                }
            } else {
                TransportError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            TransportError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// Fetch the raw Atom document for a query, retrying transient failures.
    pub async fn fetch_feed(&self, query: &ArxivQuery) -> Result<String, TransportError> {
        let url = query.url(&self.base_url);
        with_retry(&self.retry, TransportError::is_transient, || {
            self.fetch_once(&url)
        })
        .await
    }

    /// Fetch and normalize a query, keeping the parser's diagnostics.
    pub async fn fetch_report(&self, query: &ArxivQuery) -> Result<FeedReport, TransportError> {
        let body = self.fetch_feed(query).await?;
        let report = feed::parse_feed_report(&body);
        tracing::info!(
            query = %query.search_query,
            papers = report.papers.len(),
            dropped = report.dropped_entries(),
            "arXiv search completed"
        );
        Ok(report)
    }

    pub async fn fetch_by_author(
        &self,
        author: &str,
        max_results: i64,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        let query = query::author_query(author, max_results)?;
        Ok(self.fetch_report(&query).await?.papers)
    }

    pub async fn fetch_daily(
        &self,
        categories: &[String],
        date_range: Option<&str>,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        let query = query::daily_query(categories, date_range)?;
        Ok(self.fetch_report(&query).await?.papers)
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<PaperRecord>, SearchError> {
        let query = request.to_query()?;
        Ok(self.fetch_report(&query).await?.papers)
    }
}
