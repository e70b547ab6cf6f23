//! Thin HTTP transport over the execution coordinator.
//!
//! Routes mirror the engine's runtime contract: one POST per step
//! execution, one DELETE per workflow-execution teardown, and a health
//! probe over the shared store. Everything else lives in the coordinator.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::coordinator::ExecutionCoordinator;
use crate::dispatch::ExecutionResult;
use crate::error::CoordinatorError;

/// Shared handler state
#[derive(Clone)]
struct AppState {
    coordinator: Arc<ExecutionCoordinator>,
}

/// Build the runtime's router
pub fn router(coordinator: Arc<ExecutionCoordinator>) -> Router {
    Router::new()
        .route(
            "/workflows/{workflow_exec_id}/actions/{action_exec_id}",
            post(execute_step),
        )
        .route("/workflows/{workflow_exec_id}", delete(teardown_workflow))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(AppState { coordinator })
}

/// Bind and serve until shutdown
pub async fn serve(bind_addr: &str, coordinator: Arc<ExecutionCoordinator>) -> Result<()> {
    let app = router(coordinator);
    info!("Beginning server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Coordinator error translated to a transport response
struct ApiError(CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoordinatorError::Validation { .. } => StatusCode::BAD_REQUEST,
            CoordinatorError::UnknownExecutable { .. } => StatusCode::NOT_FOUND,
            CoordinatorError::UnknownOwner(_) | CoordinatorError::Store(_) => {
                error!(error = %self.0, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn execute_step(
    State(state): State<AppState>,
    Path((workflow_exec_id, action_exec_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<Value>,
) -> Result<Json<ExecutionResult>, ApiError> {
    let result = state
        .coordinator
        .execute_step(workflow_exec_id, action_exec_id, payload)
        .await?;
    Ok(Json(result))
}

async fn teardown_workflow(
    State(state): State<AppState>,
    Path(workflow_exec_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.teardown(workflow_exec_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// One health check entry in the probe report
#[derive(Debug, Serialize)]
struct CheckReport {
    test_name: &'static str,
    result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Health probe report over the shared store
#[derive(Debug, Serialize)]
struct HealthReport {
    cache: Vec<CheckReport>,
}

async fn health(State(state): State<AppState>) -> Response {
    match state.coordinator.health().await {
        Ok(latency) => Json(HealthReport {
            cache: vec![CheckReport {
                test_name: "pinging",
                result: "pass",
                time: Some(format!("{:?}", latency)),
                reason: None,
            }],
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "Runtime is unhealthy");
            (
                StatusCode::BAD_REQUEST,
                Json(HealthReport {
                    cache: vec![CheckReport {
                        test_name: "pinging",
                        result: "failed",
                        time: None,
                        reason: Some(err.to_string()),
                    }],
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutableKind;

    #[test]
    fn validation_maps_to_bad_request() {
        let response =
            ApiError(CoordinatorError::validation("missing arguments")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_executable_maps_to_not_found() {
        let response = ApiError(CoordinatorError::UnknownExecutable {
            kind: ExecutableKind::Action,
            name: "doesNotExist".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_failures_map_to_server_error() {
        let response = ApiError(CoordinatorError::Store(
            crate::store::StoreError::connection("down"),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
