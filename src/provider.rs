//! Provider abstraction for fetching market data from external APIs

use crate::{
    error::ProviderError,
    types::{CurrencyPair, MarketSnapshot},
};
use async_trait::async_trait;

/// Trait for market data providers
///
/// Implementations fetch the current price and fully diluted valuation of
/// a base currency denominated in a target currency.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches a market data snapshot for a single pair
    ///
    /// # Arguments
    /// * `pair` - The pair to fetch market data for
    ///
    /// # Returns
    /// A validated snapshot or an error if the fetch fails
    async fn fetch_market_data(&self, pair: &CurrencyPair) -> Result<MarketSnapshot, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
