//! In-memory store backend for tests and single-node use

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::store::error::StoreResult;
use crate::store::traits::KeySetStore;

/// Process-local store backend.
///
/// `add_if_absent` holds the write lock across the whole check-and-insert,
/// so the at-most-once guarantee holds for every task in this process.
#[derive(Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<String, BTreeSet<String>>>,
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeySetStore for MemoryStore {
    async fn add_if_absent(&self, set: &str, key: &str) -> StoreResult<bool> {
        let mut sets = self.sets.write().await;
        Ok(sets
            .entry(set.to_string())
            .or_default()
            .insert(key.to_string()))
    }

    async fn contains(&self, set: &str, key: &str) -> StoreResult<bool> {
        let sets = self.sets.read().await;
        Ok(sets.get(set).is_some_and(|members| members.contains(key)))
    }

    async fn remove(&self, set: &str, key: &str) -> StoreResult<()> {
        let mut sets = self.sets.write().await;
        if let Some(members) = sets.get_mut(set) {
            members.remove(key);
        }
        Ok(())
    }

    async fn scan(&self, set: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let sets = self.sets.read().await;
        Ok(sets
            .get(set)
            .map(|members| {
                members
                    .iter()
                    .filter(|member| member.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, key: &str, value: &Value) -> StoreResult<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_if_absent_reports_the_inserter() {
        let store = MemoryStore::new();
        assert!(store.add_if_absent("s", "w1:dev-1").await.unwrap());
        assert!(!store.add_if_absent("s", "w1:dev-1").await.unwrap());
        assert!(store.contains("s", "w1:dev-1").await.unwrap());
    }

    #[tokio::test]
    async fn scan_filters_by_prefix() {
        let store = MemoryStore::new();
        store.add_if_absent("s", "w1:dev-1").await.unwrap();
        store.add_if_absent("s", "w1:dev-2").await.unwrap();
        store.add_if_absent("s", "w2:dev-1").await.unwrap();

        let keys = store.scan("s", "w1:").await.unwrap();
        assert_eq!(keys, vec!["w1:dev-1".to_string(), "w1:dev-2".to_string()]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryStore::new();
        store.add_if_absent("s", "w1:dev-1").await.unwrap();
        store.remove("s", "w1:dev-1").await.unwrap();
        store.remove("s", "w1:dev-1").await.unwrap();
        assert!(!store.contains("s", "w1:dev-1").await.unwrap());
    }

    #[tokio::test]
    async fn values_round_trip() {
        let store = MemoryStore::new();
        store.put("k", &json!({"out": 3})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"out": 3})));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
