//! HTTP plumbing shared by the sample sources
//!
//! One `reqwest` client per source, a minimum interval between requests, and
//! non-success statuses surfaced as [`Error::InvalidResponse`]. Failed
//! requests are never retried.

use babble_common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const USER_AGENT: &str = concat!("babble/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default spacing between consecutive requests
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 250;

/// Enforces a minimum interval between requests
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep until the interval since the previous request has elapsed.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Rate-limited JSON/bytes client
pub struct HttpClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_min_interval(Duration::from_millis(DEFAULT_MIN_INTERVAL_MS))
    }

    pub fn with_min_interval(min_interval: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(min_interval),
        })
    }

    /// Underlying client, for building requests
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request and decode a JSON body.
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let url = response.url().to_string();
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("Malformed JSON from {}: {}", url, e)))
    }

    /// Send a request and return the raw body.
    pub async fn bytes(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.send(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Send a request; non-success statuses become `InvalidResponse`.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.rate_limiter.wait().await;

        let request = request.build().map_err(|e| Error::Http(e.to_string()))?;
        let url = request.url().to_string();
        debug!(method = %request.method(), url = %url, "HTTP request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::Http(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidResponse {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url,
                body,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(Duration::from_millis(334));
        assert_eq!(limiter.min_interval(), Duration::from_millis(334));
    }

    #[test]
    fn test_client_creation() {
        assert!(HttpClient::new().is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;

        // First call is immediate, the next two wait a full interval each
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
