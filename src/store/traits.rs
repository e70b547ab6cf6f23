//! Core trait definition for the shared key/set store

use async_trait::async_trait;
use serde_json::Value;

use super::error::StoreResult;

/// Shared key/set store visible to every runtime process serving an app.
///
/// Multiple processes may race on the same set entry, so membership
/// insertion is exposed only as the atomic [`add_if_absent`] primitive,
/// never as a separate existence check followed by an insert.
///
/// [`add_if_absent`]: KeySetStore::add_if_absent
#[async_trait]
pub trait KeySetStore: Send + Sync {
    /// Atomically insert `key` into `set`, reporting whether this caller
    /// was the one that inserted it.
    async fn add_if_absent(&self, set: &str, key: &str) -> StoreResult<bool>;

    /// Check membership of `key` in `set`
    async fn contains(&self, set: &str, key: &str) -> StoreResult<bool>;

    /// Remove `key` from `set`. Removing an absent key is a no-op.
    async fn remove(&self, set: &str, key: &str) -> StoreResult<()>;

    /// List every member of `set` starting with `prefix`
    async fn scan(&self, set: &str, prefix: &str) -> StoreResult<Vec<String>>;

    /// Store a value under a plain key
    async fn put(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Load a value by key
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;
}
