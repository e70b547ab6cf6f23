//! Per-request orchestration of one step execution.
//!
//! Flow: validate the body, build the contexts, acquire the device
//! instance if the step declares one, dispatch through the owner's
//! implementation, record the result, publish the redacted outcome.
//! Instance acquisition deliberately precedes the implementation lookup,
//! matching the engine's observable behavior: a request naming an unknown
//! executable can leave its instance registered for a later retry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accumulator::CachedAccumulator;
use crate::apps::AppRegistry;
use crate::config::RuntimeConfig;
use crate::context::{ExecutableContext, RestrictedWorkflowContext, WorkflowContext};
use crate::dispatch::{Dispatcher, ExecutionResult};
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::events::{EventSink, OutcomeEvent};
use crate::registry::InstanceRegistry;
use crate::request;
use crate::store::{KeySetStore, StoreResult};

/// The per-node execution coordinator.
///
/// Collaborators are injected once at process start; the coordinator holds
/// no request-scoped state, so one value serves every concurrent request.
pub struct ExecutionCoordinator {
    app_name: String,
    store: Arc<dyn KeySetStore>,
    registry: InstanceRegistry,
    dispatcher: Dispatcher,
    sink: Arc<dyn EventSink>,
}

impl ExecutionCoordinator {
    pub fn new(
        config: &RuntimeConfig,
        store: Arc<dyn KeySetStore>,
        apps: Arc<AppRegistry>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            app_name: config.app_name.clone(),
            registry: InstanceRegistry::new(Arc::clone(&store), Arc::clone(&apps), &config.app_name),
            dispatcher: Dispatcher::new(apps),
            store,
            sink,
        }
    }

    /// Execute one step of a workflow.
    pub async fn execute_step(
        &self,
        workflow_execution_id: Uuid,
        action_execution_id: Uuid,
        payload: Value,
    ) -> CoordinatorResult<ExecutionResult> {
        let request = request::parse(payload).map_err(|err| {
            warn!(
                %workflow_execution_id,
                %action_execution_id,
                "Schema validation error while parsing execution request"
            );
            err
        })?;

        let workflow_context =
            WorkflowContext::from_payload(workflow_execution_id, &request.workflow_context)
                .map_err(|e| CoordinatorError::validation(e.to_string()))?;
        let restricted = RestrictedWorkflowContext::from(&workflow_context);

        let executable_context = ExecutableContext::new(
            request.executable_context.kind,
            &self.app_name,
            &request.executable_context.name,
            request.executable_context.id,
        );

        let instance = match &request.executable_context.device_id {
            Some(device_id) => Some(self.registry.acquire(&workflow_context, device_id).await?),
            None => {
                debug!("App instance creation not required");
                None
            }
        };

        let arguments: HashMap<String, Value> = request
            .arguments
            .into_iter()
            .map(|argument| (argument.name, argument.value))
            .collect();

        let accumulator =
            CachedAccumulator::scoped(Arc::clone(&self.store), workflow_execution_id);

        info!(executable = %executable_context, "Executing");
        let result = self
            .dispatcher
            .execute(&executable_context, &accumulator, &arguments, instance.as_ref())
            .await?;

        let event = OutcomeEvent {
            executable_id: executable_context.id,
            kind: executable_context.kind,
            executable_name: executable_context.executable_name.clone(),
            status: result.status.clone(),
            result_key: result.result_key.clone(),
            emitted_at: chrono::Utc::now(),
        };
        if let Err(err) = self.sink.publish(&restricted, &event).await {
            // publish failure must not block the response; the sink owns
            // its own retry contract
            warn!(executable = %executable_context, error = %err, "Failed to publish outcome event");
        }

        info!(
            executable = %executable_context,
            status = %result.status,
            result_key = %result.result_key,
            "Execution finished"
        );
        Ok(result)
    }

    /// Tear down a finished workflow execution: release every registry
    /// entry the execution accumulated.
    pub async fn teardown(&self, workflow_execution_id: Uuid) -> CoordinatorResult<()> {
        let removed = self.registry.release_all(workflow_execution_id).await?;
        info!(%workflow_execution_id, removed, "Released workflow execution instances");
        Ok(())
    }

    /// Ping the shared store, reporting the round-trip time
    pub async fn health(&self) -> StoreResult<Duration> {
        let start = Instant::now();
        self.store.ping().await?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{
        AppDescriptor, AppInstance, ExecutionFault, Implementation, ResourceFactory,
    };
    use crate::accumulator::ResultAccumulator;
    use crate::config::{StoreBackend, StoreConfig};
    use crate::context::ExecutableKind;
    use crate::events::MemorySink;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct NullFactory;

    impl ResourceFactory for NullFactory {
        fn create(&self, owner: &str, device_id: &str, _context: &WorkflowContext) -> AppInstance {
            AppInstance {
                owner_name: owner.to_string(),
                device_id: device_id.to_string(),
                config: json!({}),
            }
        }
    }

    struct EchoImpl;

    #[async_trait]
    impl Implementation for EchoImpl {
        async fn invoke(
            &self,
            arguments: &HashMap<String, Value>,
            _instance: Option<&AppInstance>,
            _accumulator: &dyn ResultAccumulator,
        ) -> Result<Value, ExecutionFault> {
            Ok(arguments.get("call").cloned().unwrap_or(Value::Null))
        }
    }

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            app_name: "hello_world".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            store: StoreConfig {
                backend: StoreBackend::Memory,
                ..Default::default()
            },
        }
    }

    fn coordinator() -> (ExecutionCoordinator, Arc<MemorySink>) {
        let store: Arc<dyn KeySetStore> = Arc::new(MemoryStore::new());
        let mut apps = AppRegistry::new();
        apps.register(
            "hello_world",
            AppDescriptor::new(Arc::new(NullFactory))
                .with_implementation(ExecutableKind::Action, "repeat", Arc::new(EchoImpl))
                .with_default_status("repeat", "Repeated"),
        );
        let sink = Arc::new(MemorySink::new());
        let coordinator = ExecutionCoordinator::new(
            &config(),
            store,
            Arc::new(apps),
            Arc::clone(&sink) as Arc<dyn EventSink>,
        );
        (coordinator, sink)
    }

    fn body(device_id: Option<&str>) -> Value {
        let mut executable = json!({
            "type": "action",
            "name": "repeat",
            "id": Uuid::new_v4().to_string()
        });
        if let Some(device_id) = device_id {
            executable["device_id"] = json!(device_id);
        }
        json!({
            "workflow_context": {
                "id": Uuid::new_v4().to_string(),
                "name": "triage"
            },
            "executable_context": executable,
            "arguments": [{"name": "call", "value": "Hello World"}]
        })
    }

    #[tokio::test]
    async fn executes_and_publishes_exactly_one_event() {
        let (coordinator, sink) = coordinator();
        let wexec = Uuid::new_v4();

        let result = coordinator
            .execute_step(wexec, Uuid::new_v4(), body(None))
            .await
            .unwrap();
        assert_eq!(result.status, "Repeated");

        let published = sink.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0.workflow_execution_id, wexec);
        assert_eq!(published[0].1.status, "Repeated");
        assert_eq!(published[0].1.result_key, result.result_key);
    }

    #[tokio::test]
    async fn malformed_body_has_no_side_effects() {
        let (coordinator, sink) = coordinator();

        let mut value = body(Some("dev-1"));
        value.as_object_mut().unwrap().remove("arguments");
        let err = coordinator
            .execute_step(Uuid::new_v4(), Uuid::new_v4(), value)
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::Validation { .. }));
        assert!(sink.published().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_executable_surfaces_not_found() {
        let (coordinator, sink) = coordinator();

        let mut value = body(None);
        value["executable_context"]["name"] = json!("doesNotExist");
        let err = coordinator
            .execute_step(Uuid::new_v4(), Uuid::new_v4(), value)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoordinatorError::UnknownExecutable { kind: ExecutableKind::Action, ref name }
                if name == "doesNotExist"
        ));
        assert!(sink.published().await.is_empty());
    }

    #[tokio::test]
    async fn health_reports_ping_latency() {
        let (coordinator, _sink) = coordinator();
        assert!(coordinator.health().await.is_ok());
    }
}
