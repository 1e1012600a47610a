//! Service metrics collection and reporting
//!
//! Tracks upstream fetch latency, success rate and cache hit/miss counts.

use crate::constants::MAX_METRIC_SAMPLES;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Snapshot of the service's metrics
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    /// Name of the upstream provider
    pub provider_name: String,
    /// 50th percentile upstream latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile upstream latency in milliseconds
    pub latency_p99_ms: f64,
    /// Upstream success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of upstream fetches
    pub total_fetches: u64,
    /// Number of failed upstream fetches
    pub failed_fetches: u64,
    /// Lookups answered from a fresh cache entry
    pub cache_hits: u64,
    /// Lookups that had to go upstream
    pub cache_misses: u64,
}

impl ServiceMetrics {
    /// Creates metrics with no data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_fetches: 0,
            failed_fetches: 0,
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// Share of lookups served from cache (0.0 when nothing was looked up)
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// Internal sample for latency tracking
#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    total_fetches: u64,
    failed_fetches: u64,
    cache_hits: u64,
    cache_misses: u64,
}

/// Collects and computes metrics for the service
pub struct MetricsCollector {
    provider_name: String,
    /// Rolling window of upstream latency samples
    samples: Arc<RwLock<VecDeque<LatencySample>>>,
    /// Lifetime counters
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector for a provider
    pub fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_METRIC_SAMPLES))),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    /// Records an upstream fetch with its duration and success status
    pub async fn record_fetch(&self, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;

        {
            let mut counters = self.counters.write().await;
            counters.total_fetches += 1;
            if !success {
                counters.failed_fetches += 1;
            }
        }

        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_METRIC_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(LatencySample {
            duration_ms,
            success,
        });
    }

    /// Records a lookup served from a fresh cache entry
    pub async fn record_hit(&self) {
        self.counters.write().await.cache_hits += 1;
    }

    /// Records a lookup that had to go upstream
    pub async fn record_miss(&self) {
        self.counters.write().await.cache_misses += 1;
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> ServiceMetrics {
        let samples = self.samples.read().await;
        let counters = self.counters.read().await;

        let mut metrics = ServiceMetrics::empty(&self.provider_name);
        metrics.cache_hits = counters.cache_hits;
        metrics.cache_misses = counters.cache_misses;
        metrics.total_fetches = counters.total_fetches;
        metrics.failed_fetches = counters.failed_fetches;

        if samples.is_empty() {
            return metrics;
        }

        // Percentiles only over successful fetches
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        metrics.latency_p50_ms = percentile(&latencies, 50.0);
        metrics.latency_p99_ms = percentile(&latencies, 99.0);
        if counters.total_fetches > 0 {
            metrics.success_rate = (counters.total_fetches - counters.failed_fetches) as f64
                / counters.total_fetches as f64;
        }

        metrics
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
