//! Cache store abstraction for persisted market snapshots

use crate::{constants::CACHE_TTL_SECS, error::StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// A single cached row
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub cache_key: String,
    /// JSON text of the cached payload
    pub cache_data: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry that expires `CACHE_TTL_SECS` after `created_at`
    pub fn new(cache_key: String, cache_data: String, created_at: DateTime<Utc>) -> Self {
        Self {
            cache_key,
            cache_data,
            created_at,
            expires_at: created_at + Duration::seconds(CACHE_TTL_SECS),
        }
    }

    /// An entry is fresh strictly before its expiry
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Trait for durable key-value cache stores
///
/// Writes use replace semantics: at most one entry exists per key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Loads the entry stored under `cache_key`, if any
    async fn get(&self, cache_key: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Inserts the entry, overwriting any row with the same key
    async fn replace(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Returns the name of this store
    fn store_name(&self) -> &'static str;
}
