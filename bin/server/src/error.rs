//! HTTP error responses.
//!
//! Every failure is rendered as `{"success": false, "error": "<message>"}`.
//! Store and run failures become a generic 500; their details only go to
//! the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nodeflow_workflow::ServiceError;
use rootcause::Report;
use serde_json::json;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed.
    BadRequest { message: String },
    /// The addressed resource does not exist.
    NotFound { message: String },
    /// Something failed on our side.
    Internal { details: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { message } | Self::NotFound { message } => f.write_str(message),
            Self::Internal { details } => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::WorkflowNotFound { .. } | ServiceError::ExecutionNotFound { .. } => {
                Self::NotFound {
                    message: e.to_string(),
                }
            }
            ServiceError::InvalidGraph(_) => Self::BadRequest {
                message: e.to_string(),
            },
            ServiceError::Store(_) | ServiceError::Run(_) => Self::Internal {
                details: e.to_string(),
            },
        }
    }
}

impl From<Report<ServiceError>> for ApiError {
    fn from(report: Report<ServiceError>) -> Self {
        match Self::from(report.current_context().clone()) {
            // Keep the full cause chain for the log.
            Self::Internal { .. } => Self::Internal {
                details: report.to_string(),
            },
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest { message } | Self::NotFound { message } => message,
            Self::Internal { details } => {
                tracing::error!(error = %details, "request failed");
                "internal server error".to_string()
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
