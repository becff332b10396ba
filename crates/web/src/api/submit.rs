//! Submission creation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use patchgate_core::orchestrator::SubmissionMeta;

use crate::api::{ok, AppError};
use crate::AppState;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub upload_id: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub branch: String,
    #[serde(default)]
    pub notification_emails: Vec<String>,
    #[serde(default)]
    pub remote_node_id: Option<String>,
    #[serde(default)]
    pub git_repository: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/submit", post(create_submission))
}

/// Create a pending submission and spawn its drive task.
///
/// The response carries the pending state; the caller polls
/// `GET /status/{id}` for progress. The spawned task is the sole writer of
/// the submission record.
async fn create_submission(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let meta = SubmissionMeta {
        project: body.project,
        subject: body.subject,
        description: body.description,
        branch: body.branch,
        notification_emails: body.notification_emails,
        remote_node_id: body.remote_node_id,
        git_repository: body.git_repository,
    };
    let submission = state.orchestrator.create_submission(&body.upload_id, meta)?;
    info!(submission_id = %submission.id, "accepted submission request");

    let orchestrator = Arc::clone(&state.orchestrator);
    let submission_id = submission.id.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.submit(&submission_id).await {
            // Already persisted on the submission record; this is the only
            // observer of the task's return value.
            error!(submission_id = %submission_id, error = %e, "submission drive failed");
        }
    });

    Ok(ok(serde_json::json!({
        "submission_id": submission.id,
        "status": submission.status,
    })))
}
