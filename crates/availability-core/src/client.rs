//! HTTP client with request pacing for upstream availability endpoints
//!
//! This module provides a rate-limited HTTP client. It performs exactly one
//! attempt per call; retrying is the job of [`crate::retry::RetryPolicy`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{AvailabilityError, Result};

/// Default User-Agent mimicking a modern browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Slowest pacing accepted: one request every 1000 seconds
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

/// Default Accept-Language header
const DEFAULT_ACCEPT_LANGUAGE: &str = "fr-FR,fr;q=0.9,en;q=0.8";

/// Rate limiter to control request frequency
///
/// Ensures that requests are spaced at least `min_interval` apart,
/// which doubles as the fixed pause between query dates.
pub struct RateLimiter {
    /// Minimum interval between requests
    min_interval: Duration,
    /// Timestamp of the last request
    last_request: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// Non-positive rates disable pacing; positive rates are clamped to
    /// at least [`MIN_REQUESTS_PER_SECOND`].
    ///
    /// # Example
    /// ```
    /// use availability_core::client::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(2.0); // 2 requests per second
    /// assert_eq!(limiter.min_interval().as_millis(), 500);
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            let rate = requests_per_second.max(MIN_REQUESTS_PER_SECOND);
            Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        let now = Instant::now();
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(now.checked_sub(min_interval).unwrap_or(now))),
        }
    }

    /// Wait until the minimum interval since the previous request has passed
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();

        if elapsed < self.min_interval {
            let wait_time = self.min_interval - elapsed;
            sleep(wait_time).await;
        }

        *last = Instant::now();
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// Configuration for the upstream HTTP client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum requests per second (default: 1.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// User-Agent header
    pub user_agent: String,
    /// Accept-Language header
    pub accept_language: String,
    /// Static session cookie sent with every request
    pub cookie: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 1.0,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            cookie: None,
        }
    }
}

/// HTTP verb used by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body sent upstream
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields; sent as query string on GET
    Form(Vec<(String, String)>),
    /// JSON document
    Json(serde_json::Value),
}

/// One fully built upstream request
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: RequestBody,
}

/// HTTP client with request pacing
pub struct AvailabilityClient {
    /// Underlying HTTP client
    client: reqwest::Client,
    /// Rate limiter for request throttling
    rate_limiter: RateLimiter,
}

impl AvailabilityClient {
    /// Create a new client with default configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    /// - `AvailabilityError::Config` if a header value is not valid ASCII
    /// - `AvailabilityError::Http` if the HTTP client cannot be created
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, header_value("Accept-Language", &config.accept_language)?);
        if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            headers.insert(COOKIE, header_value("Cookie", cookie)?);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let rate_limiter = RateLimiter::new(config.requests_per_second);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Send one request and return the response body.
    ///
    /// # Errors
    /// - `AvailabilityError::Http` - transport failure or timeout
    /// - `AvailabilityError::Status` - any non-success status
    pub async fn send(&self, request: &UpstreamRequest) -> Result<String> {
        self.rate_limiter.acquire().await;

        let builder = match (request.method, &request.body) {
            (HttpMethod::Get, RequestBody::Form(fields)) => {
                self.client.get(&request.url).query(fields)
            }
            (HttpMethod::Get, RequestBody::Json(value)) => {
                self.client.get(&request.url).json(value)
            }
            (HttpMethod::Post, RequestBody::Form(fields)) => {
                self.client.post(&request.url).form(fields)
            }
            (HttpMethod::Post, RequestBody::Json(value)) => {
                self.client.post(&request.url).json(value)
            }
        };

        debug!("{:?} {}", request.method, request.url);
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AvailabilityError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        Ok(response.text().await?)
    }

    /// Get a reference to the rate limiter (for testing)
    #[cfg(test)]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AvailabilityError::Config(format!("invalid {} header: {}", name, e)))
}
