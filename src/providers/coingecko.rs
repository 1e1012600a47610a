//! CoinGecko market data provider implementation

use crate::{
    constants::{
        COINGECKO_API_URL, COINGECKO_COIN_MARKETS_ENDPOINT, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::ProviderError,
    provider::MarketDataProvider,
    types::{CurrencyPair, MarketSnapshot},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// One element of the `/coins/markets` response
///
/// The endpoint returns much more; only the fields we use are typed.
#[derive(Debug, Deserialize)]
struct CoinMarketEntry {
    current_price: f64,
    fully_diluted_valuation: Option<f64>,
}

/// CoinGecko market data provider
pub struct CoinGeckoProvider {
    client: Client,
    api_url: String,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider against the public API
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_api_url(COINGECKO_API_URL)
    }

    /// Creates a provider against a different API base URL
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(api_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Creates a provider with a custom request timeout
    pub fn with_timeout(
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the coin markets endpoint, without query string
    pub fn markets_url(&self) -> String {
        format!("{}{}", self.api_url, COINGECKO_COIN_MARKETS_ENDPOINT)
    }

    /// Validates a `/coins/markets` body into a snapshot
    fn parse_response(
        &self,
        pair: &CurrencyPair,
        body: &str,
    ) -> Result<MarketSnapshot, ProviderError> {
        let entries: Vec<CoinMarketEntry> = serde_json::from_str(body).map_err(|e| {
            ProviderError::MalformedPayload(format!(
                "Failed to parse CoinGecko response: {}. Response: {}",
                e, body
            ))
        })?;

        let entry = entries.into_iter().next().ok_or_else(|| {
            ProviderError::MalformedPayload(format!("No market data returned for {}", pair))
        })?;

        Ok(MarketSnapshot {
            base_currency: pair.base().to_string(),
            target_currency: pair.target().to_string(),
            current_price: entry.current_price,
            fully_diluted_valuation: entry.fully_diluted_valuation,
            quoted_from: self.markets_url(),
        })
    }
}

/// Maps a transport failure, keeping timeouts distinct
fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(e)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_market_data(
        &self,
        pair: &CurrencyPair,
    ) -> Result<MarketSnapshot, ProviderError> {
        let url = self.markets_url();
        tracing::debug!(url = %url, pair = %pair, "Fetching market data from CoinGecko");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", pair.base()), ("vs_currency", pair.target())])
            .send()
            .await
            .map_err(transport_error)?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(transport_error)?;
        let snapshot = self.parse_response(pair, &response_text)?;

        tracing::debug!(
            pair = %pair,
            current_price = snapshot.current_price,
            "Successfully fetched market data from CoinGecko"
        );

        Ok(snapshot)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
