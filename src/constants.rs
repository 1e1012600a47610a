//! Constants for the exchange rate cache
//!
//! All configuration for the service is centralized here.
//! No runtime configuration is used - collaborators are injected through
//! constructors and everything else is a compile-time constant.

/// How long a cached market snapshot stays fresh (in seconds)
pub const CACHE_TTL_SECS: i64 = 30;

/// Prefix for every exchange cache key
pub const CACHE_KEY_PREFIX: &str = "exchange-api";

/// HTTP request timeout when fetching market data (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Currency pairs the service will quote, as (base, target)
pub const SUPPORTED_CURRENCY_PAIRS: &[(&str, &str)] = &[("swissborg", "usd"), ("usd", "usd")];

/// Identity pair answered without touching the cache or upstream
pub const IDENTITY_CURRENCY: &str = "usd";

/// Source reported for the identity quote
pub const IDENTITY_QUOTE_SOURCE: &str = "usdc-peg";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko endpoint returning price plus market data per coin
///
/// The API allows roughly 4-5 requests per minute without a key.
pub const COINGECKO_COIN_MARKETS_ENDPOINT: &str = "/coins/markets";

/// User agent for HTTP requests
///
/// CoinGecko sits behind Cloudflare, which rejects requests without a
/// browser-like user agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Maximum number of upstream fetch samples kept for latency percentiles
pub const MAX_METRIC_SAMPLES: usize = 100;
