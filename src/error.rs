//! Error types for the exchange rate cache

use thiserror::Error;

/// Errors that can occur when fetching market data from a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body did not match the expected market data schema
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error (non-success status)
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors raised by a cache store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Errors returned by the exchange rate service
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The requested pair is not in the allow-list
    #[error("Unsupported currency pair ({base}-{target})")]
    UnsupportedPair { base: String, target: String },

    /// Upstream market data could not be fetched
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(ProviderError),

    /// Upstream or cached payload failed validation
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Cache store failure
    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),
}

impl ExchangeError {
    /// Creates an UnsupportedPair error
    pub fn unsupported_pair(base: &str, target: &str) -> Self {
        Self::UnsupportedPair {
            base: base.to_string(),
            target: target.to_string(),
        }
    }

    /// Creates a MalformedPayload error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}

impl From<ProviderError> for ExchangeError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MalformedPayload(msg) => Self::MalformedPayload(msg),
            other => Self::UpstreamFetch(other),
        }
    }
}
