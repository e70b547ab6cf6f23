//! Instance registry: at-most-once creation of device-scoped app instances
//! across every runtime process sharing the store.
//!
//! Membership in the per-owner registry set is the single source of truth
//! for "does a live instance exist for this (workflow execution, device)
//! pair". Acquisition is a single atomic `add_if_absent` against the
//! shared store; two processes racing on the same pair see exactly one
//! inserter, and only the inserter runs the owner's constructor.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::apps::{AppInstance, AppRegistry};
use crate::context::WorkflowContext;
use crate::store::{KeySetStore, StoreError};

/// Prefix of the per-owner registry set name
pub const INSTANCE_SET_PREFIX: &str = "app_instance_created_set";

/// Separator joining key segments
pub const KEY_SEPARATOR: &str = ":";

/// Errors from instance acquisition and release
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no resource factory registered for owner {0}")]
    UnknownOwner(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared registry of live resource instances for one owner
pub struct InstanceRegistry {
    store: Arc<dyn KeySetStore>,
    apps: Arc<AppRegistry>,
    owner_name: String,
    set_name: String,
}

impl InstanceRegistry {
    pub fn new(store: Arc<dyn KeySetStore>, apps: Arc<AppRegistry>, owner_name: &str) -> Self {
        Self {
            store,
            apps,
            owner_name: owner_name.to_string(),
            set_name: format!("{}{}{}", INSTANCE_SET_PREFIX, KEY_SEPARATOR, owner_name),
        }
    }

    /// Registry key for a (workflow execution, device) pair
    pub fn instance_key(workflow_execution_id: &Uuid, device_id: &str) -> String {
        format!("{}{}{}", workflow_execution_id, KEY_SEPARATOR, device_id)
    }

    /// Scan prefix matching every key of one workflow execution
    pub fn scan_prefix(workflow_execution_id: &Uuid) -> String {
        format!("{}{}", workflow_execution_id, KEY_SEPARATOR)
    }

    /// Acquire the instance for a (workflow execution, device) pair.
    ///
    /// If this caller registered the pair, the owner's factory builds a
    /// fresh instance; otherwise an equivalent instance is rebuilt from
    /// cached configuration. An already-registered pair is the normal
    /// reuse path, never an error.
    pub async fn acquire(
        &self,
        context: &WorkflowContext,
        device_id: &str,
    ) -> Result<AppInstance, RegistryError> {
        let factory = self
            .apps
            .resolve_factory(&self.owner_name)
            .ok_or_else(|| RegistryError::UnknownOwner(self.owner_name.clone()))?;

        let key = Self::instance_key(&context.workflow_execution_id, device_id);
        if self.store.add_if_absent(&self.set_name, &key).await? {
            info!(
                workflow_execution_id = %context.workflow_execution_id,
                device_id,
                "Creating new app instance"
            );
            Ok(factory.create(&self.owner_name, device_id, context))
        } else {
            debug!(
                workflow_execution_id = %context.workflow_execution_id,
                device_id,
                "Rebuilding existing app instance"
            );
            Ok(factory.rebuild(&self.owner_name, device_id, context))
        }
    }

    /// Remove every registry entry belonging to a finished workflow
    /// execution. Idempotent; entries of other workflow executions sharing
    /// the owner's set are untouched.
    pub async fn release_all(&self, workflow_execution_id: Uuid) -> Result<usize, RegistryError> {
        let prefix = Self::scan_prefix(&workflow_execution_id);
        let keys = self.store.scan(&self.set_name, &prefix).await?;
        for key in &keys {
            debug!(key = %key, set = %self.set_name, "Deleting registry entry");
            self.store.remove(&self.set_name, key).await?;
        }
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{AppDescriptor, ResourceFactory};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        rebuilt: AtomicUsize,
    }

    impl ResourceFactory for CountingFactory {
        fn create(&self, owner: &str, device_id: &str, _context: &WorkflowContext) -> AppInstance {
            self.created.fetch_add(1, Ordering::SeqCst);
            AppInstance {
                owner_name: owner.to_string(),
                device_id: device_id.to_string(),
                config: json!({"fresh": true}),
            }
        }

        fn rebuild(&self, owner: &str, device_id: &str, _context: &WorkflowContext) -> AppInstance {
            self.rebuilt.fetch_add(1, Ordering::SeqCst);
            AppInstance {
                owner_name: owner.to_string(),
                device_id: device_id.to_string(),
                config: json!({"fresh": false}),
            }
        }
    }

    fn workflow_context(workflow_execution_id: Uuid) -> WorkflowContext {
        WorkflowContext {
            workflow_execution_id,
            workflow_id: Uuid::new_v4(),
            workflow_name: "wf".to_string(),
            extra: Default::default(),
        }
    }

    fn fixture() -> (InstanceRegistry, Arc<CountingFactory>, Arc<dyn KeySetStore>) {
        let store: Arc<dyn KeySetStore> = Arc::new(MemoryStore::new());
        let factory = Arc::new(CountingFactory::default());
        let mut apps = AppRegistry::new();
        apps.register("hello_world", AppDescriptor::new(factory.clone()));
        let registry = InstanceRegistry::new(Arc::clone(&store), Arc::new(apps), "hello_world");
        (registry, factory, store)
    }

    #[tokio::test]
    async fn first_acquire_creates_second_rebuilds() {
        let (registry, factory, store) = fixture();
        let wexec = Uuid::new_v4();
        let context = workflow_context(wexec);

        let first = registry.acquire(&context, "dev-1").await.unwrap();
        let second = registry.acquire(&context, "dev-1").await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.rebuilt.load(Ordering::SeqCst), 1);
        assert_eq!(first.device_id, second.device_id);

        // still exactly one registry entry for the pair
        let set_name = format!("{}:hello_world", INSTANCE_SET_PREFIX);
        let keys = store
            .scan(&set_name, &InstanceRegistry::scan_prefix(&wexec))
            .await
            .unwrap();
        assert_eq!(keys, vec![InstanceRegistry::instance_key(&wexec, "dev-1")]);
    }

    #[tokio::test]
    async fn concurrent_acquires_construct_exactly_once() {
        let (registry, factory, _store) = fixture();
        let registry = Arc::new(registry);
        let wexec = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            let context = workflow_context(wexec);
            handles.push(tokio::spawn(async move {
                registry.acquire(&context, "dev-1").await.unwrap()
            }));
        }
        for handle in handles {
            let instance = handle.await.unwrap();
            assert_eq!(instance.device_id, "dev-1");
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(factory.rebuilt.load(Ordering::SeqCst), 31);
    }

    #[tokio::test]
    async fn release_all_spares_other_workflow_executions() {
        let (registry, _factory, store) = fixture();
        let finished = Uuid::new_v4();
        let running = Uuid::new_v4();

        registry
            .acquire(&workflow_context(finished), "dev-1")
            .await
            .unwrap();
        registry
            .acquire(&workflow_context(finished), "dev-2")
            .await
            .unwrap();
        registry
            .acquire(&workflow_context(running), "dev-1")
            .await
            .unwrap();

        let removed = registry.release_all(finished).await.unwrap();
        assert_eq!(removed, 2);

        let set_name = format!("{}:hello_world", INSTANCE_SET_PREFIX);
        assert!(store
            .scan(&set_name, &InstanceRegistry::scan_prefix(&finished))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .scan(&set_name, &InstanceRegistry::scan_prefix(&running))
                .await
                .unwrap(),
            vec![InstanceRegistry::instance_key(&running, "dev-1")]
        );
    }

    #[tokio::test]
    async fn release_all_is_idempotent() {
        let (registry, _factory, _store) = fixture();
        let wexec = Uuid::new_v4();
        assert_eq!(registry.release_all(wexec).await.unwrap(), 0);
        assert_eq!(registry.release_all(wexec).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn acquire_after_release_creates_again() {
        let (registry, factory, _store) = fixture();
        let wexec = Uuid::new_v4();
        let context = workflow_context(wexec);

        registry.acquire(&context, "dev-1").await.unwrap();
        registry.release_all(wexec).await.unwrap();
        registry.acquire(&context, "dev-1").await.unwrap();

        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn acquire_without_factory_is_an_error() {
        let store: Arc<dyn KeySetStore> = Arc::new(MemoryStore::new());
        let registry = InstanceRegistry::new(store, Arc::new(AppRegistry::new()), "ghost");
        let err = registry
            .acquire(&workflow_context(Uuid::new_v4()), "dev-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownOwner(owner) if owner == "ghost"));
    }
}
