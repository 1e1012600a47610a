use exchange_rate_cache::{
    CoinGeckoProvider, ExchangeRateService, ExchangeRequest, SqliteCacheStore,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_url = std::env::var("EXCHANGE_CACHE_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://exchange-cache.db".to_string());
    let mut args = std::env::args().skip(1);
    let base = args.next().unwrap_or_else(|| "swissborg".to_string());
    let target = args.next().unwrap_or_else(|| "usd".to_string());

    let store = SqliteCacheStore::connect(&db_url).await?;
    let service = ExchangeRateService::new(Arc::new(CoinGeckoProvider::new()?), Arc::new(store));
    let request = ExchangeRequest::new(base, target);

    // Second lookup should be served from cache
    for _ in 0..2 {
        let quote = service.get_exchange_data(&request).await?;
        println!("{}", serde_json::to_string_pretty(&quote)?);
    }

    let metrics = service.metrics().await;
    println!(
        "provider={} hits={} misses={} p50={:.0}ms",
        metrics.provider_name, metrics.cache_hits, metrics.cache_misses, metrics.latency_p50_ms
    );

    Ok(())
}
