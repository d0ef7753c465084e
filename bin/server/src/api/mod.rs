//! HTTP API.
//!
//! JSON routes under `/api`, the node event stream, and static pages for
//! everything else.

pub mod events;
pub mod executions;
pub mod workflows;

use axum::{
    Router,
    routing::{get, post},
};
use nodeflow_core::{ExecutionId, WorkflowId};
use nodeflow_workflow::{BroadcastEventSink, WorkflowService};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Shared state for every route.
pub struct AppState {
    /// Workflow CRUD and runs.
    pub service: WorkflowService,
    /// Source of the node event stream.
    pub events: BroadcastEventSink,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(service: WorkflowService, events: BroadcastEventSink) -> Self {
        Self { service, events }
    }
}

pub(crate) fn parse_workflow_id(id: &str) -> Result<WorkflowId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::bad_request(format!("invalid workflow id '{id}': {e}")))
}

pub(crate) fn parse_execution_id(id: &str) -> Result<ExecutionId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::bad_request(format!("invalid execution id '{id}': {e}")))
}

/// Builds the `/api` routes.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/workflows",
            get(workflows::list).post(workflows::create),
        )
        .route(
            "/api/workflows/{id}",
            get(workflows::get)
                .put(workflows::update)
                .delete(workflows::delete),
        )
        .route("/api/workflows/{id}/run", post(workflows::run))
        .route("/api/executions", get(executions::list))
        .route("/api/executions/{id}", get(executions::get))
        .route("/api/active-workflows", get(workflows::active))
        .route("/api/events", get(events::stream))
        .with_state(state)
}

/// Extensionless page paths and the files behind them.
const PAGES: [(&str, &str); 3] = [
    ("/editor", "editor.html"),
    ("/workflows", "workflows.html"),
    ("/executions", "executions.html"),
];

/// Builds the full application: API routes, the named pages and other
/// static files from `static_dir`, permissive CORS, and request tracing.
pub fn app(state: Arc<AppState>, static_dir: &Path) -> Router {
    let router = PAGES.into_iter().fold(routes(state), |router, (path, file)| {
        router.route_service(path, ServeFile::new(static_dir.join(file)))
    });

    router
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
