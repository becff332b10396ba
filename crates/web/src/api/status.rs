//! Status polling and health endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::{ok, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status/{submission_id}", get(get_status))
        .route("/health", get(health_check))
}

async fn health_check() -> Json<serde_json::Value> {
    ok(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Latest persisted state and log tail for one submission.
async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let view = state.orchestrator.get_submission_status(&submission_id)?;
    Ok(ok(serde_json::json!({
        "status": view.status,
        "change_id": view.change_id,
        "change_url": view.change_url,
        "created_at": view.created_at.to_rfc3339(),
        "error": view.error,
        "logs": view.logs,
    })))
}
