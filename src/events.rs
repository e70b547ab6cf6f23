//! Outcome events and the event sink seam.
//!
//! The sink receives a direct, scoped `publish` call once per executed
//! step; there is no process-wide bus and nothing to unsubscribe. The
//! payload is the redacted view: the restricted workflow context plus the
//! outcome, never argument values or device identifiers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::context::{ExecutableKind, RestrictedWorkflowContext};

/// Redacted description of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub executable_id: Uuid,
    pub kind: ExecutableKind,
    pub executable_name: String,
    pub status: String,
    pub result_key: String,
    pub emitted_at: DateTime<Utc>,
}

/// Sink publish failure. Publishing happens after the result is recorded,
/// so a failure is logged rather than surfaced to the caller.
#[derive(Error, Debug)]
#[error("event sink error: {0}")]
pub struct SinkError(pub String);

/// External event sink seam
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(
        &self,
        context: &RestrictedWorkflowContext,
        event: &OutcomeEvent,
    ) -> Result<(), SinkError>;
}

/// Sink that emits outcomes to the structured log
#[derive(Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(
        &self,
        context: &RestrictedWorkflowContext,
        event: &OutcomeEvent,
    ) -> Result<(), SinkError> {
        info!(
            workflow_execution_id = %context.workflow_execution_id,
            workflow_id = %context.workflow_id,
            workflow_name = %context.workflow_name,
            executable_id = %event.executable_id,
            kind = %event.kind,
            executable_name = %event.executable_name,
            status = %event.status,
            result_key = %event.result_key,
            "Execution outcome"
        );
        Ok(())
    }
}

/// In-memory sink recording every published event, for tests
#[derive(Default)]
pub struct MemorySink {
    published: tokio::sync::Mutex<Vec<(RestrictedWorkflowContext, OutcomeEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<(RestrictedWorkflowContext, OutcomeEvent)> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(
        &self,
        context: &RestrictedWorkflowContext,
        event: &OutcomeEvent,
    ) -> Result<(), SinkError> {
        self.published
            .lock()
            .await
            .push((context.clone(), event.clone()));
        Ok(())
    }
}
