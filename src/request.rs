//! Execution request payload decoding and validation.
//!
//! The transport hands over the decoded JSON body untyped; this module
//! enforces the request schema before anything in the core runs, so a
//! malformed request produces no side effects on the registry, the
//! accumulator, or the event sink.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::context::ExecutableKind;
use crate::error::CoordinatorError;

/// One named argument for the executable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

/// The `executable_context` object of the request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutablePayload {
    #[serde(rename = "type")]
    pub kind: ExecutableKind,
    pub name: String,
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// A validated step-execution request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub workflow_context: Map<String, Value>,
    pub executable_context: ExecutablePayload,
    pub arguments: Vec<Argument>,
}

/// Decode and validate a request body.
///
/// Violations surface as a single validation fault carrying the reason;
/// the transport translates that to a client-error response.
pub fn parse(payload: Value) -> Result<ExecutionRequest, CoordinatorError> {
    let request: ExecutionRequest = serde_json::from_value(payload)
        .map_err(|e| CoordinatorError::validation(e.to_string()))?;

    if request.executable_context.name.is_empty() {
        return Err(CoordinatorError::validation(
            "executable_context.name must not be empty",
        ));
    }
    if request
        .arguments
        .iter()
        .any(|argument| argument.name.is_empty())
    {
        return Err(CoordinatorError::validation(
            "argument names must not be empty",
        ));
    }

    Ok(request)
}
