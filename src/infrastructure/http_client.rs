//! HTTP client for web crawling with rate limiting and error handling
//!
//! One client is shared by every pipeline stage, so the token bucket bounds
//! the aggregate request rate no matter how many workers are running.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, Url,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{FetchError, PageFetcher};
use crate::infrastructure::config::HttpConfig;

/// HTTP client configuration for crawling
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        HttpConfig::default().into()
    }
}

impl From<HttpConfig> for HttpClientConfig {
    fn from(config: HttpConfig) -> Self {
        Self {
            user_agent: config.user_agent,
            timeout_seconds: config.timeout_seconds,
            max_requests_per_second: config.max_requests_per_second,
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        }
    }
}

/// Rate-limited HTTP client that stops waiting as soon as the run is cancelled
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
    cancellation_token: CancellationToken,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig, cancellation_token: CancellationToken) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
            cancellation_token,
        })
    }

    /// Backoff before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.config.retry_base_delay_ms.saturating_mul(factor))
    }

    /// Fetch a page body, retrying transient failures with exponential backoff
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.get_text(url).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.retry_delay(attempt);
                    attempt += 1;
                    warn!(
                        "🔄 Retry {}/{} for {} in {:?}: {}",
                        attempt, self.config.max_retries, url, delay, error
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        _ = self.cancellation_token.cancelled() => {
                            return Err(FetchError::Cancelled { url: url.to_string() });
                        }
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Fetch URL and return text content with cancellation support
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let cancelled = || FetchError::Cancelled {
            url: url.to_string(),
        };

        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if self.cancellation_token.is_cancelled() {
            return Err(cancelled());
        }

        tokio::select! {
            _ = self.rate_limiter.until_ready() => {},
            _ = self.cancellation_token.cancelled() => return Err(cancelled()),
        }

        debug!("Fetching URL: {}", url);

        let response = tokio::select! {
            result = self.client.get(parsed).send() => {
                result.map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                })?
            },
            _ = self.cancellation_token.cancelled() => {
                warn!("🛑 HTTP request cancelled for URL: {}", url);
                return Err(cancelled());
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = tokio::select! {
            result = response.text() => {
                result.map_err(|e| FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                })?
            },
            _ = self.cancellation_token.cancelled() => return Err(cancelled()),
        };

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_with_retry(url).await
    }
}
