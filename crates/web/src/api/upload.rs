//! Patch upload endpoint.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};

use patchgate_core::models::{Upload, ValidationStatus};
use patchgate_core::patch;

use crate::api::{ok, AppError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload_patch))
}

/// Accept a multipart patch upload (`file`, `project`).
///
/// Validation failure is not an HTTP error: the invalid upload is stored
/// with its error message and the envelope reports it, so the client can
/// show the reason without retrying blind.
async fn upload_patch(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut filename = String::from("patch.diff");
    let mut content: Option<String> = None;
    let mut project: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string());
        match field_name.as_deref() {
            Some("file") => {
                if let Some(name) = field.file_name() {
                    filename = name.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file: {}", e)))?;
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| AppError::BadRequest("patch file is not valid UTF-8".into()))?;
                content = Some(text);
            }
            Some("project") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read project: {}", e)))?;
                project = Some(text);
            }
            _ => {}
        }
    }

    let content = content.ok_or_else(|| AppError::BadRequest("missing 'file' field".into()))?;
    let project = project.ok_or_else(|| AppError::BadRequest("missing 'project' field".into()))?;
    if project.trim().is_empty() {
        return Err(AppError::BadRequest("project must not be empty".into()));
    }

    let validation_error = patch::validate(&content).err().map(|e| e.to_string());
    if let Some(ref error) = validation_error {
        warn!(filename = %filename, error = %error, "patch failed validation");
    }
    let upload = Upload::new(filename, content, project, validation_error);
    state.db.insert_upload(&upload).map_err(|e| {
        AppError::Internal(format!("failed to store upload: {}", e))
    })?;

    let message = match upload.validation_status {
        ValidationStatus::Valid => {
            let summary = patch::parse(&upload.content);
            info!(upload_id = %upload.id, files = summary.files.len(), "stored valid upload");
            format!(
                "patch accepted: {} file(s), +{} -{}",
                summary.files.len(),
                summary.total_additions,
                summary.total_deletions
            )
        }
        ValidationStatus::Invalid => upload
            .validation_error
            .clone()
            .unwrap_or_else(|| "validation failed".into()),
    };

    Ok(ok(serde_json::json!({
        "upload_id": upload.id,
        "status": upload.validation_status,
        "message": message,
    })))
}
