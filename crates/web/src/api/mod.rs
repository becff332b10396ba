//! REST API handlers.
//!
//! Every endpoint answers with the same envelope: `{"success": true,
//! "data": {...}}` on success, `{"success": false, "error": "..."}` with an
//! appropriate status code otherwise.

pub mod ai;
pub mod status;
pub mod submit;
pub mod upload;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use patchgate_core::errors::OrchestratorError;

/// Success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "data": data }))
}

/// API error that renders the failure envelope.
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<OrchestratorError> for AppError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::SubmissionNotFound(_) | OrchestratorError::UploadNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            OrchestratorError::UploadInvalid { .. } | OrchestratorError::InvalidRequest(_) => {
                AppError::BadRequest(e.to_string())
            }
            OrchestratorError::TerminalState { .. } => AppError::Conflict(e.to_string()),
            OrchestratorError::GerritError(_) | OrchestratorError::DatabaseError(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}
