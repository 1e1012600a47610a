//! SQLite-backed cache store

use crate::{
    error::StoreError,
    store::{CacheEntry, CacheStore},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Cache store persisted in the `cache_store` table
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    /// Opens (creating if needed) the database at `db_url` and runs migrations
    ///
    /// In-memory URLs get a single long-lived connection, since every
    /// SQLite in-memory connection is its own database.
    pub async fn connect(db_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);

        let pool_options = if is_in_memory(db_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool and runs migrations on it
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!().run(&pool).await?;
        tracing::debug!("Cache store migrations applied");
        Ok(Self { pool })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, cache_key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let record = sqlx::query_as::<_, (String, String, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            SELECT cache_key, cache_data, created_at, expires_at
            FROM cache_store
            WHERE cache_key = ?
            "#,
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|(cache_key, cache_data, created_at, expires_at)| CacheEntry {
            cache_key,
            cache_data,
            created_at,
            expires_at,
        }))
    }

    async fn replace(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            REPLACE INTO cache_store (cache_key, created_at, expires_at, cache_data)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&entry.cache_key)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .bind(&entry.cache_data)
        .execute(&self.pool)
        .await?;

        tracing::debug!(cache_key = %entry.cache_key, "Replaced cache row");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "sqlite"
    }
}
