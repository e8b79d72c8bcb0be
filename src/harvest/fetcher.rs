//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made by the scraper:
//! - Building an HTTP client that carries the configured header set
//! - GET requests for listing and review pages
//! - Error classification (transport failure vs. non-success status)

use crate::config::Config;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Source of raw page bodies
///
/// The production implementation is [`HttpFetcher`]; tests substitute
/// in-process fakes.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Performs one GET request and returns the response body as text
    async fn fetch(&self, url: &str) -> Result<String, HarvestError>;
}

/// Builds an HTTP client that sends `headers` with every request
///
/// # Arguments
///
/// * `headers` - Header name/value pairs (e.g. `User-Agent`)
/// * `timeout` - Per-request timeout
///
/// # Example
///
/// ```no_run
/// use review_harvest::harvest::build_http_client;
/// use std::collections::BTreeMap;
/// use std::time::Duration;
///
/// let mut headers = BTreeMap::new();
/// headers.insert("User-Agent".to_string(), "Mozilla/5.0".to_string());
///
/// let client = build_http_client(&headers, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<Client, HarvestError> {
    let mut default_headers = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| crate::ConfigError::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| crate::ConfigError::InvalidHeader(format!("{}: {}", name.as_str(), e)))?;
        default_headers.insert(name, value);
    }

    let client = Client::builder()
        .default_headers(default_headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the header set and timeout in `config`
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(
            &config.headers,
            Duration::from_secs(config.scraper.request_timeout_secs),
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_headers() -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), "TestAgent/1.0".to_string());
        headers.insert("Accept-Language".to_string(), "en-US".to_string());
        headers
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&test_headers(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_rejects_bad_header() {
        let mut headers = test_headers();
        headers.insert("Bad Name".to_string(), "x".to_string());

        let result = build_http_client(&headers, Duration::from_secs(5));
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        let client = build_http_client(&test_headers(), Duration::from_secs(2)).unwrap();
        let fetcher = HttpFetcher::new(client);

        // Port 9 on localhost is the discard port and is almost never listening
        let result = fetcher.fetch("http://127.0.0.1:9/").await;
        assert!(matches!(result, Err(HarvestError::Http { .. })));
    }

    // Status handling and header propagation are covered with wiremock in
    // the integration tests
}
