//! HTTP feed fetcher with resource limits.
//!
//! The fetcher only returns the raw body; parsing is done separately so a
//! successful fetch can be recorded before the document is inspected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::shutdown::Shutdown;
use crate::{GatorError, Result};

/// Source of raw feed documents.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the body at `url`.
    ///
    /// Returns [`GatorError::Cancelled`] if `shutdown` fires before the
    /// request completes.
    async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<Vec<u8>>;
}

/// Fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_size: u64,
}

impl HttpFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatorError::Network(format!("failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatorError::Network(format!("HTTP error from {url}: {status}")));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(GatorError::Network(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatorError::Network(format!("failed to read response from {url}: {e}")))?;

        if bytes.len() as u64 > self.max_size {
            return Err(GatorError::Network(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_size
            )));
        }

        debug!(url, size = bytes.len(), "fetched feed");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<Vec<u8>> {
        validate_url(url)?;

        if shutdown.is_triggered() {
            return Err(GatorError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(GatorError::Cancelled),
            result = self.get_bytes(url) => result,
        }
    }
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| GatorError::Network(format!("invalid URL '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(GatorError::Network(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(GatorError::Network(format!("URL has no host: {url}")));
    }

    Ok(())
}
