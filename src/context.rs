//! Context value objects assembled once per execution request.
//!
//! `ExecutableContext` identifies the step being run, `WorkflowContext`
//! carries the caller's snapshot of the enclosing workflow, and
//! `RestrictedWorkflowContext` is the narrowed projection that is the only
//! context shape ever handed to the event sink.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Closed set of executable kinds the engine dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutableKind {
    Action,
    Condition,
    Transform,
    Branch,
}

impl fmt::Display for ExecutableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Action => "action",
            Self::Condition => "condition",
            Self::Transform => "transform",
            Self::Branch => "branch",
        };
        f.write_str(name)
    }
}

/// Identifies one step to run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableContext {
    pub kind: ExecutableKind,
    pub owner_name: String,
    pub executable_name: String,
    pub id: Uuid,
}

impl ExecutableContext {
    pub fn new(
        kind: ExecutableKind,
        owner_name: impl Into<String>,
        executable_name: impl Into<String>,
        id: Uuid,
    ) -> Self {
        Self {
            kind,
            owner_name: owner_name.into(),
            executable_name: executable_name.into(),
            id,
        }
    }

    pub fn is_action(&self) -> bool {
        self.kind == ExecutableKind::Action
    }
}

impl fmt::Display for ExecutableContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} ({})",
            self.kind, self.owner_name, self.executable_name, self.id
        )
    }
}

/// Errors from context assembly over a decoded payload
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("workflow context is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("workflow context field '{0}' is malformed")]
    MalformedField(&'static str),
}

/// The caller-supplied snapshot of the enclosing workflow.
///
/// Caller keys are re-prefixed with `workflow_` (`id` becomes
/// `workflow_id`, `name` becomes `workflow_name`) so they cannot collide
/// with executable-scoped fields downstream. Fields beyond the known three
/// are carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub workflow_execution_id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub extra: Map<String, Value>,
}

impl WorkflowContext {
    /// Assemble a workflow context from the request's `workflow_context`
    /// object and the workflow execution id carried in the request path.
    ///
    /// Performs no I/O. Structurally invalid payloads are rejected by
    /// request validation before this runs; the errors here cover the
    /// field-level checks that validation delegates to the builder.
    pub fn from_payload(
        workflow_execution_id: Uuid,
        fields: &Map<String, Value>,
    ) -> Result<Self, ContextError> {
        let workflow_id = fields
            .get("id")
            .ok_or(ContextError::MissingField("id"))?
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or(ContextError::MalformedField("id"))?;

        let workflow_name = fields
            .get("name")
            .ok_or(ContextError::MissingField("name"))?
            .as_str()
            .ok_or(ContextError::MalformedField("name"))?
            .to_string();

        let mut extra = Map::new();
        for (key, value) in fields {
            if key == "id" || key == "name" {
                continue;
            }
            extra.insert(format!("workflow_{}", key), value.clone());
        }

        Ok(Self {
            workflow_execution_id,
            workflow_id,
            workflow_name,
            extra,
        })
    }
}

/// The redacted subset of workflow context safe to publish externally.
///
/// Invariant: no argument values, device identifiers, or internal execution
/// detail ever cross this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedWorkflowContext {
    pub workflow_execution_id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
}

impl From<&WorkflowContext> for RestrictedWorkflowContext {
    fn from(context: &WorkflowContext) -> Self {
        Self {
            workflow_execution_id: context.workflow_execution_id,
            workflow_id: context.workflow_id,
            workflow_name: context.workflow_name.clone(),
        }
    }
}
