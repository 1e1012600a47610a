//! Types for the exchange rate cache

use crate::{
    constants::{CACHE_KEY_PREFIX, IDENTITY_CURRENCY, SUPPORTED_CURRENCY_PAIRS},
    error::ExchangeError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A supported (base, target) currency pair
///
/// Can only be constructed through [`CurrencyPair::supported`], so holding
/// one means the pair is in the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    base: String,
    target: String,
}

impl CurrencyPair {
    /// Validates a pair against the allow-list
    ///
    /// Matching is exact: symbols are expected in lowercase.
    pub fn supported(base: &str, target: &str) -> Result<Self, ExchangeError> {
        let is_supported = SUPPORTED_CURRENCY_PAIRS
            .iter()
            .any(|(b, t)| *b == base && *t == target);

        if !is_supported {
            return Err(ExchangeError::unsupported_pair(base, target));
        }

        Ok(Self {
            base: base.to_string(),
            target: target.to_string(),
        })
    }

    /// Get all supported pairs, in allow-list order
    pub fn all() -> Vec<CurrencyPair> {
        SUPPORTED_CURRENCY_PAIRS
            .iter()
            .map(|(base, target)| Self {
                base: base.to_string(),
                target: target.to_string(),
            })
            .collect()
    }

    /// Base currency (CoinGecko coin id)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Target currency (CoinGecko `vs_currency`)
    pub fn target(&self) -> &str {
        &self.target
    }

    /// True for the usd-usd pair, which is never cached
    pub fn is_identity(&self) -> bool {
        self.base == IDENTITY_CURRENCY && self.target == IDENTITY_CURRENCY
    }

    /// Cache key for this pair, e.g. `exchange-api/swissborg-usd`
    pub fn cache_key(&self) -> String {
        format!("{}/{}-{}", CACHE_KEY_PREFIX, self.base, self.target)
    }
}

impl std::fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.base, self.target)
    }
}

/// Request surface of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub base_currency: String,
    pub target_currency: String,
}

impl ExchangeRequest {
    pub fn new(base_currency: impl Into<String>, target_currency: impl Into<String>) -> Self {
        Self {
            base_currency: base_currency.into(),
            target_currency: target_currency.into(),
        }
    }
}

/// Market data snapshot as fetched upstream and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub base_currency: String,
    pub target_currency: String,
    pub current_price: f64,
    /// CoinGecko reports `null` for coins without a max supply
    pub fully_diluted_valuation: Option<f64>,
    /// Upstream endpoint the data came from
    pub quoted_from: String,
}

/// Whether a quote was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Cache annotation attached to a quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub cache_status: CacheStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Quote returned to callers
///
/// Built fresh on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeQuote {
    pub base_currency: String,
    pub target_currency: String,
    pub current_price: f64,
    pub fully_diluted_valuation: Option<f64>,
    pub quoted_from: String,
    /// Absent for the identity pair
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cache: Option<CacheInfo>,
}

impl ExchangeQuote {
    /// Builds a quote from a snapshot and its cache annotation
    pub fn from_snapshot(snapshot: MarketSnapshot, cache: CacheInfo) -> Self {
        Self {
            base_currency: snapshot.base_currency,
            target_currency: snapshot.target_currency,
            current_price: snapshot.current_price,
            fully_diluted_valuation: snapshot.fully_diluted_valuation,
            quoted_from: snapshot.quoted_from,
            cache: Some(cache),
        }
    }

    /// Cache status, if the quote went through the cache
    pub fn cache_status(&self) -> Option<CacheStatus> {
        self.cache.as_ref().map(|c| c.cache_status)
    }
}
