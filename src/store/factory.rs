//! Store factory for creating backend instances

use std::sync::Arc;

use super::backends::MemoryStore;
#[cfg(feature = "redis")]
use super::backends::RedisStore;
use super::error::StoreResult;
use super::traits::KeySetStore;
use crate::config::{StoreBackend, StoreConfig};

/// Factory for creating store instances
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store from explicit configuration
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Arc<dyn KeySetStore>> {
        match config.backend {
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            #[cfg(feature = "redis")]
            StoreBackend::Redis => {
                let store = RedisStore::new(&config.redis).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "redis"))]
            StoreBackend::Redis => Err(super::error::StoreError::configuration(
                "Redis backend not enabled. Enable with --features redis",
            )),
        }
    }
}
