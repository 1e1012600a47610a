//! Exchange rate cache service
//!
//! Answers quote requests from a time-bounded cache, going upstream only
//! when the cached snapshot is missing or expired.

use crate::{
    clock::{Clock, SystemClock},
    constants::IDENTITY_QUOTE_SOURCE,
    error::ExchangeError,
    metrics::{MetricsCollector, ServiceMetrics},
    provider::MarketDataProvider,
    store::{CacheEntry, CacheStore},
    types::{
        CacheInfo, CacheStatus, CurrencyPair, ExchangeQuote, ExchangeRequest, MarketSnapshot,
    },
};
use std::sync::Arc;
use std::time::Instant;

/// Cache-aside exchange rate service
///
/// Each lookup makes at most one upstream call. Concurrent misses for the
/// same key are not coalesced: each goes upstream and the last write wins.
///
/// # Example
/// ```no_run
/// use exchange_rate_cache::{
///     CoinGeckoProvider, ExchangeRateService, ExchangeRequest, SqliteCacheStore,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteCacheStore::connect("sqlite://exchange-cache.db").await?;
/// let service = ExchangeRateService::new(Arc::new(CoinGeckoProvider::new()?), Arc::new(store));
///
/// let quote = service
///     .get_exchange_data(&ExchangeRequest::new("swissborg", "usd"))
///     .await?;
/// println!("BORG: ${:.4}", quote.current_price);
/// # Ok(())
/// # }
/// ```
pub struct ExchangeRateService {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricsCollector>,
}

impl ExchangeRateService {
    /// Creates a service using the wall clock
    pub fn new(provider: Arc<dyn MarketDataProvider>, store: Arc<dyn CacheStore>) -> Self {
        Self::with_clock(provider, store, Arc::new(SystemClock))
    }

    /// Creates a service with a custom time source
    pub fn with_clock(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new(provider.provider_name()));
        Self {
            provider,
            store,
            clock,
            metrics,
        }
    }

    /// Gets a quote for the requested pair
    ///
    /// Fails with [`ExchangeError::UnsupportedPair`] before any I/O when the
    /// pair is not in the allow-list.
    pub async fn get_exchange_data(
        &self,
        request: &ExchangeRequest,
    ) -> Result<ExchangeQuote, ExchangeError> {
        let pair = CurrencyPair::supported(&request.base_currency, &request.target_currency)?;
        self.get_quote(&pair).await
    }

    /// Gets a quote for an already validated pair
    pub async fn get_quote(&self, pair: &CurrencyPair) -> Result<ExchangeQuote, ExchangeError> {
        if pair.is_identity() {
            return Ok(identity_quote(pair));
        }

        let cache_key = pair.cache_key();
        let now = self.clock.now();

        if let Some(entry) = self.store.get(&cache_key).await? {
            if entry.is_fresh(now) {
                let snapshot = decode_snapshot(&entry)?;
                self.metrics.record_hit().await;
                tracing::debug!(
                    cache_key = %cache_key,
                    expires_at = %entry.expires_at,
                    "Cache hit"
                );

                return Ok(ExchangeQuote::from_snapshot(
                    snapshot,
                    CacheInfo {
                        cache_status: CacheStatus::Hit,
                        created_at: entry.created_at,
                        expires_at: entry.expires_at,
                    },
                ));
            }
            tracing::debug!(
                cache_key = %cache_key,
                expired_at = %entry.expires_at,
                "Cache entry expired"
            );
        }

        self.metrics.record_miss().await;
        tracing::debug!(cache_key = %cache_key, "Cache miss");
        self.fetch_and_store(pair).await
    }

    /// Refetches every cached pair and overwrites its entry
    ///
    /// Stops at the first failure; pairs refreshed before it stay written.
    pub async fn refresh_all(&self) -> Result<Vec<ExchangeQuote>, ExchangeError> {
        let mut quotes = Vec::new();

        for pair in CurrencyPair::all().iter().filter(|p| !p.is_identity()) {
            let quote = self.fetch_and_store(pair).await?;
            tracing::info!(
                pair = %pair,
                current_price = quote.current_price,
                "Refreshed exchange data"
            );
            quotes.push(quote);
        }

        Ok(quotes)
    }

    /// Returns the name of the upstream provider
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Returns the name of the cache store backend
    pub fn store_name(&self) -> &str {
        self.store.store_name()
    }

    /// Gets upstream latency, success rate and cache hit/miss counts
    pub async fn metrics(&self) -> ServiceMetrics {
        self.metrics.get_metrics().await
    }

    /// Fetches upstream, replaces the cache row and returns a MISS quote
    ///
    /// Nothing is written unless the fetch succeeds.
    async fn fetch_and_store(&self, pair: &CurrencyPair) -> Result<ExchangeQuote, ExchangeError> {
        let snapshot = self.fetch_upstream(pair).await?;

        let cache_data = serde_json::to_string(&snapshot).map_err(|e| {
            ExchangeError::malformed(format!("Failed to encode snapshot for {}: {}", pair, e))
        })?;
        let entry = CacheEntry::new(pair.cache_key(), cache_data, self.clock.now());
        self.store.replace(&entry).await?;

        Ok(ExchangeQuote::from_snapshot(
            snapshot,
            CacheInfo {
                cache_status: CacheStatus::Miss,
                created_at: entry.created_at,
                expires_at: entry.expires_at,
            },
        ))
    }

    async fn fetch_upstream(&self, pair: &CurrencyPair) -> Result<MarketSnapshot, ExchangeError> {
        let start = Instant::now();

        match self.provider.fetch_market_data(pair).await {
            Ok(snapshot) => {
                self.metrics.record_fetch(start.elapsed(), true).await;
                tracing::debug!(
                    pair = %pair,
                    provider = self.provider.provider_name(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Fetched market data"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.metrics.record_fetch(start.elapsed(), false).await;
                tracing::warn!(
                    pair = %pair,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Failed to fetch market data"
                );
                Err(e.into())
            }
        }
    }
}

/// Constant quote for usd-usd
fn identity_quote(pair: &CurrencyPair) -> ExchangeQuote {
    ExchangeQuote {
        base_currency: pair.base().to_string(),
        target_currency: pair.target().to_string(),
        current_price: 1.0,
        fully_diluted_valuation: Some(0.0),
        quoted_from: IDENTITY_QUOTE_SOURCE.to_string(),
        cache: None,
    }
}

fn decode_snapshot(entry: &CacheEntry) -> Result<MarketSnapshot, ExchangeError> {
    serde_json::from_str(&entry.cache_data).map_err(|e| {
        ExchangeError::malformed(format!(
            "Cached data for {} is invalid: {}",
            entry.cache_key, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::mock::ManualClock, error::ProviderError, provider::mock::MockProvider,
        store::mock::CountingStore, stores::SqliteCacheStore,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    struct Harness {
        provider: Arc<MockProvider>,
        store: Arc<CountingStore>,
        clock: Arc<ManualClock>,
        service: ExchangeRateService,
    }

    fn harness() -> Harness {
        let provider = Arc::new(MockProvider::new());
        provider.set_market_data("swissborg", "usd", 1.23, Some(999.0));
        let store = Arc::new(CountingStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let service =
            ExchangeRateService::with_clock(provider.clone(), store.clone(), clock.clone());

        Harness {
            provider,
            store,
            clock,
            service,
        }
    }

    fn borg_usd() -> ExchangeRequest {
        ExchangeRequest::new("swissborg", "usd")
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let h = harness();

        let first = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(first.cache_status(), Some(CacheStatus::Miss));

        let second = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(second.cache_status(), Some(CacheStatus::Hit));
        assert_eq!(second.current_price, first.current_price);
        assert_eq!(second.cache, first.cache.map(|c| CacheInfo {
            cache_status: CacheStatus::Hit,
            ..c
        }));

        assert_eq!(h.provider.call_count(), 1);
        assert_eq!(h.store.writes(), 1);
    }

    #[tokio::test]
    async fn test_ttl_scenario() {
        let h = harness();

        // t=0: miss
        let quote = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(quote.cache_status(), Some(CacheStatus::Miss));
        assert_eq!(quote.current_price, 1.23);
        assert_eq!(quote.fully_diluted_valuation, Some(999.0));
        let cache = quote.cache.unwrap();
        assert_eq!(cache.created_at, t0());
        assert_eq!(cache.expires_at, t0() + Duration::seconds(30));

        // t=10: hit, same values
        h.clock.advance(10);
        let quote = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(quote.cache_status(), Some(CacheStatus::Hit));
        assert_eq!(quote.current_price, 1.23);
        assert_eq!(quote.fully_diluted_valuation, Some(999.0));
        assert_eq!(h.provider.call_count(), 1);

        // t=31: miss again with a fresh upstream call
        h.provider.set_market_data("swissborg", "usd", 1.30, Some(1000.0));
        h.clock.advance(21);
        let quote = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(quote.cache_status(), Some(CacheStatus::Miss));
        assert_eq!(quote.current_price, 1.30);
        assert_eq!(h.provider.call_count(), 2);

        let cache = quote.cache.unwrap();
        assert_eq!(cache.created_at, t0() + Duration::seconds(31));
        assert_eq!(cache.expires_at, t0() + Duration::seconds(61));
    }

    #[tokio::test]
    async fn test_entry_is_stale_at_expiry() {
        let h = harness();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();

        h.clock.set(t0() + Duration::seconds(30));
        let quote = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(quote.cache_status(), Some(CacheStatus::Miss));
        assert_eq!(h.provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_identity_pair_bypasses_cache() {
        let h = harness();

        for _ in 0..5 {
            let quote = h
                .service
                .get_exchange_data(&ExchangeRequest::new("usd", "usd"))
                .await
                .unwrap();
            assert_eq!(quote.current_price, 1.0);
            assert_eq!(quote.fully_diluted_valuation, Some(0.0));
            assert_eq!(quote.quoted_from, "usdc-peg");
            assert!(quote.cache.is_none());
        }

        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.store.reads(), 0);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_pair_performs_no_io() {
        let h = harness();

        let err = h
            .service
            .get_exchange_data(&ExchangeRequest::new("eur", "usd"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::UnsupportedPair { ref base, ref target }
                if base == "eur" && target == "usd"
        ));

        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.store.reads(), 0);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_leaves_cache_untouched() {
        let h = harness();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();
        let before = h.store.peek("exchange-api/swissborg-usd").await.unwrap();

        h.provider.set_error("swissborg", "usd", ProviderError::RateLimitExceeded);
        h.clock.advance(45);

        let err = h.service.get_exchange_data(&borg_usd()).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::UpstreamFetch(ProviderError::RateLimitExceeded)
        ));

        // No fallback to the stale row, and the stale row is still there
        assert_eq!(h.store.writes(), 1);
        assert_eq!(h.store.peek("exchange-api/swissborg-usd").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_malformed_upstream_payload() {
        let h = harness();
        h.provider.set_error(
            "swissborg",
            "usd",
            ProviderError::MalformedPayload("empty array".into()),
        );

        let err = h.service.get_exchange_data(&borg_usd()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedPayload(_)));
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_cached_payload() {
        let h = harness();
        h.store
            .seed(CacheEntry::new(
                "exchange-api/swissborg-usd".into(),
                r#"{"currentPrice":"oops"}"#.into(),
                t0(),
            ))
            .await;

        let err = h.service.get_exchange_data(&borg_usd()).await.unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedPayload(_)));
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_cached_data_matches_upstream_snapshot() {
        let h = harness();
        let pair = CurrencyPair::supported("swissborg", "usd").unwrap();
        let upstream = h.provider.fetch_market_data(&pair).await.unwrap();

        h.service.get_exchange_data(&borg_usd()).await.unwrap();
        let entry = h.store.peek(&pair.cache_key()).await.unwrap();
        assert_eq!(entry.cache_data, serde_json::to_string(&upstream).unwrap());

        let hit = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(hit.base_currency, upstream.base_currency);
        assert_eq!(hit.target_currency, upstream.target_currency);
        assert_eq!(hit.current_price, upstream.current_price);
        assert_eq!(hit.fully_diluted_valuation, upstream.fully_diluted_valuation);
        assert_eq!(hit.quoted_from, upstream.quoted_from);
    }

    #[tokio::test]
    async fn test_refresh_all_overwrites_fresh_entries() {
        let h = harness();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();

        h.provider.set_market_data("swissborg", "usd", 2.5, None);
        h.clock.advance(5);
        let quotes = h.service.refresh_all().await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].base_currency, "swissborg");
        assert_eq!(quotes[0].cache_status(), Some(CacheStatus::Miss));
        assert_eq!(h.provider.call_count(), 2);

        let hit = h.service.get_exchange_data(&borg_usd()).await.unwrap();
        assert_eq!(hit.cache_status(), Some(CacheStatus::Hit));
        assert_eq!(hit.current_price, 2.5);
        assert_eq!(hit.fully_diluted_valuation, None);
        assert_eq!(hit.cache.unwrap().created_at, t0() + Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_refresh_all_propagates_failure() {
        let h = harness();
        h.provider.set_error("swissborg", "usd", ProviderError::Timeout);

        let err = h.service.refresh_all().await.unwrap_err();
        assert!(matches!(err, ExchangeError::UpstreamFetch(ProviderError::Timeout)));
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_metrics_track_hits_and_fetches() {
        let h = harness();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();
        h.service.get_exchange_data(&borg_usd()).await.unwrap();

        let metrics = h.service.metrics().await;
        assert_eq!(metrics.provider_name, "mock");
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.cache_hits, 2);
        assert_eq!(metrics.total_fetches, 1);
        assert_eq!(metrics.failed_fetches, 0);
        assert_eq!(metrics.success_rate, 1.0);
    }

    #[tokio::test]
    async fn test_sqlite_backed_service() {
        let provider = Arc::new(MockProvider::new());
        provider.set_market_data("swissborg", "usd", 0.19, Some(190_000_000.0));
        let store = SqliteCacheStore::connect("sqlite::memory:").await.unwrap();
        let clock = Arc::new(ManualClock::new(t0()));
        let service =
            ExchangeRateService::with_clock(provider.clone(), Arc::new(store), clock.clone());
        assert_eq!(service.store_name(), "sqlite");

        let miss = service.get_exchange_data(&borg_usd()).await.unwrap();
        clock.advance(10);
        let hit = service.get_exchange_data(&borg_usd()).await.unwrap();

        assert_eq!(miss.cache_status(), Some(CacheStatus::Miss));
        assert_eq!(hit.cache_status(), Some(CacheStatus::Hit));
        assert_eq!(hit.current_price, 0.19);
        assert_eq!(hit.cache.unwrap().expires_at, t0() + Duration::seconds(30));
        assert_eq!(provider.call_count(), 1);
    }
}
