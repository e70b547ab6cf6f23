//! Result accumulator: stores a step's result under a deterministic key
//! scoped to the owning workflow execution, so dependent steps running on
//! any process can look it up later.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{KeySetStore, StoreResult};

/// Workflow-scoped result store seam consumed by implementations and the
/// dispatcher.
#[async_trait]
pub trait ResultAccumulator: Send + Sync {
    /// Deterministic result key for an executable id. Pure: the same id
    /// always yields the same key, regardless of scope or process.
    fn format_key(&self, executable_id: &Uuid) -> String;

    /// Store a raw result value under a key within the active scope
    async fn store(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Load a previously stored value from the active scope
    async fn load(&self, key: &str) -> StoreResult<Option<Value>>;
}

/// Accumulator backed by the shared store.
///
/// One value is constructed per request, scoped to that request's workflow
/// execution id; the scope is never shared mutable state across requests.
pub struct CachedAccumulator {
    store: Arc<dyn KeySetStore>,
    scope: Uuid,
}

impl CachedAccumulator {
    /// Create an accumulator whose scope is the given workflow execution
    pub fn scoped(store: Arc<dyn KeySetStore>, workflow_execution_id: Uuid) -> Self {
        Self {
            store,
            scope: workflow_execution_id,
        }
    }

    fn storage_key(&self, key: &str) -> String {
        format!("acc:{}:{}", self.scope, key)
    }
}

#[async_trait]
impl ResultAccumulator for CachedAccumulator {
    fn format_key(&self, executable_id: &Uuid) -> String {
        format!("result:{}", executable_id)
    }

    async fn store(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.store.put(&self.storage_key(key), value).await
    }

    async fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        self.store.get(&self.storage_key(key)).await
    }
}
