//! Asana API error types.
//!
//! Rate limiting (429) never surfaces here unless a retry cap is configured; the
//! client absorbs it. Everything else is fatal for the run.

use std::time::Duration;

use reqwest::header::HeaderMap;
use thiserror::Error;

/// Wait used when a 429 carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Error from Asana API calls.
#[derive(Debug, Error)]
pub enum AsanaError {
    /// Network-level failure (connect, timeout, broken body).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx, non-429 response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response whose body does not have the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Consecutive 429s exceeded the configured cap.
    #[error("Still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    /// A mutation needs a record that was never looked up (e.g. the tag, without `prepare`).
    #[error("Not resolved: {0}")]
    Unresolved(String),
}

impl AsanaError {
    /// Build an `Api` error from a response status and body.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Api {
            status,
            message: error_message(body),
        }
    }

    /// HTTP status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            AsanaError::Api { status, .. } => Some(*status),
            AsanaError::RateLimitExhausted { .. } => Some(429),
            AsanaError::Transport(e) => e.status().map(|s| s.as_u16()),
            AsanaError::Decode { .. } | AsanaError::Unresolved(_) => None,
        }
    }
}

/// Extract the human-readable message from an Asana error body.
///
/// Asana answers `{"errors": [{"message": "..."}]}`; anything else is returned as-is.
fn error_message(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("errors").and_then(|e| e.as_array()).cloned())
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "(empty response body)".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        messages.join("; ")
    }
}

/// Parse the `Retry-After` header as a number of seconds.
///
/// Returns `None` when the header is absent, negative or not a number.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0 && *secs <= u32::MAX as f64)
        .map(Duration::from_secs_f64)
}
