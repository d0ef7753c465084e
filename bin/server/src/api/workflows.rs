//! Workflow routes.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use nodeflow_workflow::{NewWorkflow, WorkflowUpdate};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

use super::{AppState, parse_workflow_id};
use crate::error::ApiError;

/// Lists all workflows, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let workflows = state.service.list_workflows().await?;
    Ok(Json(json!({ "success": true, "workflows": workflows })))
}

/// Fetches one workflow.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_workflow_id(&id)?;
    let workflow = state.service.get_workflow(id).await?;
    Ok(Json(json!({ "success": true, "workflow": workflow })))
}

/// Creates a workflow. New workflows start inactive.
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewWorkflow>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let workflow = state.service.create_workflow(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "workflow": workflow })),
    ))
}

/// Replaces a workflow's name, description, graph and active flag.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<WorkflowUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_workflow_id(&id)?;
    let Json(update) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let workflow = state.service.update_workflow(id, update).await?;
    Ok(Json(json!({ "success": true, "workflow": workflow })))
}

/// Deletes a workflow; deleting a missing one reports `deleted: false`.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_workflow_id(&id)?;
    let deleted = state.service.delete_workflow(id).await?;
    Ok(Json(json!({ "success": true, "result": { "deleted": deleted } })))
}

/// Runs a workflow. The request body is the trigger payload; an empty body
/// runs with `{}`.
pub async fn run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_workflow_id(&id)?;
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice::<JsonValue>(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid trigger payload: {e}")))?
    };

    let result = state.service.run_workflow(id, payload).await?;
    Ok(Json(json!({ "success": true, "result": result })))
}

/// Lists the workflows in the active index.
pub async fn active(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let workflows = state.service.active_workflows().await;
    Json(json!({ "success": true, "workflows": workflows }))
}
