//! Execution dispatch: run one executable through its registered
//! implementation and resolve the final status.
//!
//! Status resolution is exhaustive over the outcome: a faultless action
//! resolves through the owner's default-status policy, a faultless
//! non-action resolves to `Success`, and a caught fault resolves to
//! `UnhandledException` without propagating to the caller.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::accumulator::ResultAccumulator;
use crate::apps::{AppInstance, AppRegistry};
use crate::context::{ExecutableContext, ExecutableKind};
use crate::store::StoreError;

/// Status of a faultless non-action executable, and the fallback status
/// for actions whose owner declares no default
pub const STATUS_SUCCESS: &str = "Success";

/// Status recorded when an implementation faults
pub const STATUS_UNHANDLED_EXCEPTION: &str = "UnhandledException";

/// Errors the dispatcher raises to the caller.
///
/// An execution fault inside the implementation is deliberately absent:
/// it resolves into the recorded status instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown {kind} {name}")]
    UnknownExecutable { kind: ExecutableKind, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The addressable outcome of one executed step
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionResult {
    pub status: String,
    pub result_key: String,
}

/// Runs executables through the implementations registered for their owner
pub struct Dispatcher {
    apps: Arc<AppRegistry>,
}

impl Dispatcher {
    pub fn new(apps: Arc<AppRegistry>) -> Self {
        Self { apps }
    }

    /// Execute one step and record its raw result.
    ///
    /// The invocation is not bounded: a stuck implementation stalls the
    /// calling request. The raw result value is always stored under the
    /// deterministic result key before this returns, on the fault path
    /// included.
    pub async fn execute(
        &self,
        context: &ExecutableContext,
        accumulator: &dyn ResultAccumulator,
        arguments: &HashMap<String, Value>,
        instance: Option<&AppInstance>,
    ) -> Result<ExecutionResult, DispatchError> {
        let implementation = self
            .apps
            .resolve_implementation(context.kind, &context.owner_name, &context.executable_name)
            .ok_or_else(|| DispatchError::UnknownExecutable {
                kind: context.kind,
                name: context.executable_name.clone(),
            })?;

        let (status, value) = match implementation.invoke(arguments, instance, accumulator).await {
            Ok(value) => {
                let status = if context.is_action() {
                    self.apps
                        .default_status(&context.owner_name, &context.executable_name)
                } else {
                    STATUS_SUCCESS.to_string()
                };
                (status, value)
            }
            Err(fault) => {
                warn!(executable = %context, error = %fault, "Unhandled exception while executing");
                (
                    STATUS_UNHANDLED_EXCEPTION.to_string(),
                    json!({ "error": fault.to_string() }),
                )
            }
        };

        let result_key = accumulator.format_key(&context.id);
        accumulator.store(&result_key, &value).await?;

        Ok(ExecutionResult { status, result_key })
    }
}
