//! Execution record routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{AppState, parse_execution_id, parse_workflow_id};
use crate::error::ApiError;

/// Query parameters for listing executions.
#[derive(Debug, Deserialize)]
pub struct ExecutionFilter {
    workflow_id: Option<String>,
}

/// Lists execution records, newest first. An empty `workflow_id` is no
/// filter.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ExecutionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let workflow_id = filter
        .workflow_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(parse_workflow_id)
        .transpose()?;
    let executions = state.service.list_executions(workflow_id).await?;
    Ok(Json(json!({ "success": true, "executions": executions })))
}

/// Fetches one execution record.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_execution_id(&id)?;
    let execution = state.service.get_execution(id).await?;
    Ok(Json(json!({ "success": true, "execution": execution })))
}
