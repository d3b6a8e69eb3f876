//! Client error types.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the Zencoder API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a status outside 200-299.
    #[error("Request failed ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response headers
        headers: HeaderMap,
        /// Raw response body
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The status was a success but the body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn api(code: u16, headers: HeaderMap, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            headers,
            message: message.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Api { code, .. } => Some(*code),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    ///
    /// Network failures, 429 and 5xx are transient. Everything else will
    /// fail the same way on the next attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Api { code, .. } => *code == 429 || (500..=599).contains(code),
            _ => false,
        }
    }

    /// Delay requested by a `Retry-After` header (seconds form only).
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ClientError::Api { code: 429, headers, .. } => headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000)),
            _ => None,
        }
    }
}
