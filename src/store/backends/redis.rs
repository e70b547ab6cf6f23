//! Redis store backend

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::config::RedisConfig;
use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::KeySetStore;

/// Redis-backed shared store.
///
/// Sets map onto redis sets; `add_if_absent` is a single `SADD`, whose
/// reply already reports whether the caller inserted the member, so the
/// at-most-once guarantee holds across processes without a lock.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create a new redis store and verify the connection
    pub async fn new(config: &RedisConfig) -> StoreResult<Self> {
        info!(url = %config.url, pool_size = config.pool_size, "Initializing redis store");

        let mut pool_config = Config::from_url(&config.url);
        let mut pool_settings = PoolConfig::new(config.pool_size);
        pool_settings.timeouts.wait = Some(Duration::from_secs(10));
        pool_settings.timeouts.create = Some(Duration::from_secs(10));
        pool_settings.timeouts.recycle = Some(Duration::from_secs(10));
        pool_config.pool = Some(pool_settings);

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::connection(format!("Failed to create redis pool: {}", e)))?;

        let store = Self { pool };
        store.ping().await?;
        Ok(store)
    }

    async fn connection(&self) -> StoreResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::connection(e.to_string()))
    }
}

#[async_trait]
impl KeySetStore for RedisStore {
    async fn add_if_absent(&self, set: &str, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let added: i64 = conn
            .sadd(set, key)
            .await
            .map_err(|e| StoreError::io(e.to_string()))?;
        Ok(added == 1)
    }

    async fn contains(&self, set: &str, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        conn.sismember(set, key)
            .await
            .map_err(|e| StoreError::io(e.to_string()))
    }

    async fn remove(&self, set: &str, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = conn
            .srem(set, key)
            .await
            .map_err(|e| StoreError::io(e.to_string()))?;
        Ok(())
    }

    async fn scan(&self, set: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", prefix);

        let mut keys = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> = conn
                .sscan_match(set, &pattern)
                .await
                .map_err(|e| StoreError::io(e.to_string()))?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn put(&self, key: &str, value: &Value) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(value)?;
        let _: () = conn
            .set(key, payload)
            .await
            .map_err(|e| StoreError::io(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| StoreError::io(e.to_string()))?;
        raw.map(|payload| serde_json::from_str(&payload).map_err(StoreError::from))
            .transpose()
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;
        if response == "PONG" {
            Ok(())
        } else {
            Err(StoreError::connection(format!(
                "Unexpected PING response: {}",
                response
            )))
        }
    }
}
