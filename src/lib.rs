//! # Exchange Rate Cache
//!
//! Serves price quotes for a small allow-list of currency pairs, shielding
//! a rate-limited upstream market data API (CoinGecko) behind a 30 second
//! cache-aside layer persisted in a key-value store.
//!
//! ## Usage
//!
//! Collaborators are injected; there is no global instance:
//!
//! ```no_run
//! use exchange_rate_cache::{
//!     CacheStatus, CoinGeckoProvider, ExchangeRateService, ExchangeRequest, SqliteCacheStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteCacheStore::connect("sqlite://exchange-cache.db").await?;
//! let provider = CoinGeckoProvider::new()?;
//! let service = ExchangeRateService::new(Arc::new(provider), Arc::new(store));
//!
//! let quote = service
//!     .get_exchange_data(&ExchangeRequest::new("swissborg", "usd"))
//!     .await?;
//! if quote.cache_status() == Some(CacheStatus::Hit) {
//!     println!("served from cache");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ExchangeRateService::get_exchange_data
//!     ↓ (allow-list check, usd-usd short-circuit)
//! CacheStore (SQLite or in-memory)
//!     ↓ (miss or expired)
//! MarketDataProvider (CoinGecko)
//!     ↓
//! CacheStore::replace → ExchangeQuote
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use exchange_rate_cache::{ExchangeError, ExchangeRateService, ExchangeRequest};
//!
//! # async fn example(service: ExchangeRateService) {
//! match service.get_exchange_data(&ExchangeRequest::new("eur", "usd")).await {
//!     Ok(quote) => println!("{}", quote.current_price),
//!     Err(ExchangeError::UnsupportedPair { base, target }) => {
//!         println!("{}-{} is not quoted", base, target)
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! # }
//! ```

pub mod clock;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod service;
pub mod store;
pub mod stores;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use error::{ExchangeError, ProviderError, StoreError};
pub use metrics::ServiceMetrics;
pub use provider::MarketDataProvider;
pub use providers::CoinGeckoProvider;
pub use service::ExchangeRateService;
pub use store::{CacheEntry, CacheStore};
pub use stores::{MemoryCacheStore, SqliteCacheStore};
pub use types::{
    CacheInfo, CacheStatus, CurrencyPair, ExchangeQuote, ExchangeRequest, MarketSnapshot,
};
