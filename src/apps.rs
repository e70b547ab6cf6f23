//! Owner capability registry.
//!
//! An "owner" is the app providing implementations for a family of
//! executables. App crates link against this runtime and register a
//! resource factory plus one implementation per (kind, name) pair; the
//! dispatcher and the instance registry resolve against this table at
//! request time instead of reaching into process-wide globals.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::accumulator::ResultAccumulator;
use crate::context::{ExecutableKind, WorkflowContext};
use crate::dispatch::STATUS_SUCCESS;

/// A device-scoped, process-local resource instance.
///
/// The shared registry owns only the fact that the logical instance
/// exists; the value itself is rebuilt from cached configuration on any
/// process that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppInstance {
    pub owner_name: String,
    pub device_id: String,
    pub config: Value,
}

/// Fault raised by an app implementation during its own logic.
///
/// A fault is a recorded outcome, not a protocol error: the coordinator
/// resolves it to the `UnhandledException` status and still answers the
/// request.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ExecutionFault {
    pub message: String,
}

impl ExecutionFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Constructs device-scoped resource instances for one owner
pub trait ResourceFactory: Send + Sync {
    /// Build a brand-new instance for a (workflow execution, device) pair
    fn create(&self, owner: &str, device_id: &str, context: &WorkflowContext) -> AppInstance;

    /// Reconstruct an equivalent instance from cached configuration when
    /// the registry already records the pair as live
    fn rebuild(&self, owner: &str, device_id: &str, context: &WorkflowContext) -> AppInstance {
        self.create(owner, device_id, context)
    }
}

/// One registered executable implementation
#[async_trait]
pub trait Implementation: Send + Sync {
    async fn invoke(
        &self,
        arguments: &HashMap<String, Value>,
        instance: Option<&AppInstance>,
        accumulator: &dyn ResultAccumulator,
    ) -> Result<Value, ExecutionFault>;
}

/// Everything one owner contributes: a resource factory, implementations
/// keyed by (kind, name), and the owner's default-status vocabulary for
/// its actions.
pub struct AppDescriptor {
    factory: Arc<dyn ResourceFactory>,
    implementations: HashMap<(ExecutableKind, String), Arc<dyn Implementation>>,
    default_statuses: HashMap<String, String>,
}

impl AppDescriptor {
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self {
            factory,
            implementations: HashMap::new(),
            default_statuses: HashMap::new(),
        }
    }

    pub fn with_implementation(
        mut self,
        kind: ExecutableKind,
        name: impl Into<String>,
        implementation: Arc<dyn Implementation>,
    ) -> Self {
        self.implementations
            .insert((kind, name.into()), implementation);
        self
    }

    /// Declare the status an action resolves to when it completes without
    /// fault. Actions without a declared status resolve to `Success`.
    pub fn with_default_status(
        mut self,
        executable_name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        self.default_statuses
            .insert(executable_name.into(), status.into());
        self
    }
}

/// Registry of owners known to this runtime process
#[derive(Default)]
pub struct AppRegistry {
    owners: HashMap<String, AppDescriptor>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: impl Into<String>, descriptor: AppDescriptor) {
        self.owners.insert(owner.into(), descriptor);
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Resolve the resource factory for an owner
    pub fn resolve_factory(&self, owner: &str) -> Option<Arc<dyn ResourceFactory>> {
        self.owners
            .get(owner)
            .map(|descriptor| Arc::clone(&descriptor.factory))
    }

    /// Resolve the implementation registered for (kind, owner, name)
    pub fn resolve_implementation(
        &self,
        kind: ExecutableKind,
        owner: &str,
        name: &str,
    ) -> Option<Arc<dyn Implementation>> {
        self.owners.get(owner).and_then(|descriptor| {
            descriptor
                .implementations
                .get(&(kind, name.to_string()))
                .map(Arc::clone)
        })
    }

    /// Owner-specific default-status policy for a faultless action
    pub fn default_status(&self, owner: &str, executable_name: &str) -> String {
        self.owners
            .get(owner)
            .and_then(|descriptor| descriptor.default_statuses.get(executable_name))
            .cloned()
            .unwrap_or_else(|| STATUS_SUCCESS.to_string())
    }
}
