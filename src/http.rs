//! HTTP transport for the remote service: header composition,
//! cache-busting, rate limiting and transport-level retry.
//!
//! Responses are classified here: 2xx with a JSON body is success; a 2xx
//! body that is not valid JSON is reported as an API failure because the
//! callers always expect structured data; non-2xx responses carry the
//! server's payload back and are never retried at this layer. Only
//! transport-level failures (connect errors, mid-body drops) are retried,
//! with doubling backoff.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::rate_limit::RateLimiter;

use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Total attempts per request (one initial try plus two retries).
pub(crate) const MAX_ATTEMPTS: u32 = 3;

/// Backoff base; doubled on each retry (2s before the first retry, 4s
/// before the second).
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Longest server error payload kept in an error message.
const ERROR_BODY_LIMIT: usize = 300;

/// Build a [`reqwest::Client`] configured for the remote service.
///
/// # Errors
///
/// Returns [`SyncError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SyncConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SyncError::Http(format!("failed to build HTTP client: {e}")))
}

/// Backoff before retry number `attempt` (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

/// Append the cache-busting `_t` query parameter carrying the current
/// unix-millisecond timestamp.
pub(crate) fn with_cache_buster(url: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(url)
        .map_err(|e| SyncError::Http(format!("invalid request URL {url:?}: {e}")))?;
    let millis = chrono::Utc::now().timestamp_millis();
    url.query_pairs_mut()
        .append_pair("_t", &millis.to_string());
    Ok(url)
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut cut = ERROR_BODY_LIMIT;
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &trimmed[..cut])
}

/// Rate-limited, retrying request layer shared by all domain operations.
pub struct Transport {
    client: reqwest::Client,
    limiter: RateLimiter,
    credential: String,
}

impl Transport {
    /// Build the transport from config: HTTP client, sliding-window
    /// limiter and the verbatim credential.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            limiter: RateLimiter::new(
                config.rate_limit_max,
                Duration::from_millis(config.rate_limit_window_ms),
            ),
            credential: config.credential.clone(),
        })
    }

    /// Issue one authenticated request and return the parsed JSON body.
    ///
    /// Each attempt passes through the rate limiter independently, so
    /// retries are throttled like any other call.
    ///
    /// # Errors
    ///
    /// [`SyncError::Api`] for non-2xx responses or non-JSON 2xx bodies
    /// (not retried); [`SyncError::Http`] when all attempts failed at the
    /// transport level.
    pub async fn request(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        let mut last_failure = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                tracing::debug!(url, attempt, ?delay, "retrying after transport failure");
                tokio::time::sleep(delay).await;
            }

            self.limiter.acquire().await;

            // Each attempt gets its own cache-busting stamp.
            let attempt_url = with_cache_buster(url)?;
            let mut request = self
                .client
                .request(method.clone(), attempt_url)
                .header(COOKIE, &self.credential)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_failure = e.to_string();
                    continue;
                }
            };

            let status = response.status();
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    // Body read failures are transport-level too.
                    last_failure = e.to_string();
                    continue;
                }
            };

            if status.is_success() {
                return serde_json::from_str::<Value>(&text).map_err(|_| SyncError::Api {
                    status: status.as_u16(),
                    message: "response body was not valid JSON".into(),
                });
            }

            tracing::debug!(%url, status = status.as_u16(), "remote returned error status");
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: truncate_body(&text),
            });
        }

        Err(SyncError::Http(format!(
            "request failed after {MAX_ATTEMPTS} attempts: {last_failure}"
        )))
    }
}
