//! In-memory cache store

use crate::{
    error::StoreError,
    store::{CacheEntry, CacheStore},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store keyed by cache key
///
/// Same replace semantics as the SQLite store; contents are lost on drop.
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored entries, fresh or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, cache_key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(cache_key).cloned())
    }

    async fn replace(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.cache_key.clone(), entry.clone());
        tracing::debug!(cache_key = %entry.cache_key, "Replaced cache entry");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
