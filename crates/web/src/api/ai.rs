//! AI conflict-resolution endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use patchgate_core::models::ResolutionPick;
use patchgate_core::providers::ResolveRequest;

use crate::api::{ok, AppError};
use crate::AppState;

#[derive(Deserialize)]
pub struct ResolveConflictRequest {
    pub original_code: String,
    pub incoming_code: String,
    pub current_code: String,
    pub file_path: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub use_multiple_providers: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/resolve-conflict", post(resolve_conflict))
        .route("/ai/providers", get(list_providers))
        .route("/ai/test-providers", post(test_providers))
}

/// Resolve one conflict, with a single named provider or a full fan-out.
async fn resolve_conflict(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResolveConflictRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.providers.is_enabled() {
        return Err(AppError::BadRequest(
            "AI conflict resolution is disabled".into(),
        ));
    }

    let request = ResolveRequest {
        file_path: body.file_path,
        original: body.original_code,
        incoming: body.incoming_code,
        current: body.current_code,
    };

    if body.use_multiple_providers {
        let pick = state
            .engine
            .resolve_with_multiple_providers(&request)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        info!(
            recommended = %pick.recommended_provider,
            path = %request.file_path,
            "multi-provider resolution completed"
        );
        return Ok(ok(pick_payload(&pick)));
    }

    let provider = body
        .provider
        .ok_or_else(|| AppError::BadRequest("provider is required unless fanning out".into()))?;
    let resolution = state.engine.resolve_with_provider(&provider, &request).await;
    Ok(ok(resolution))
}

/// Flatten a fan-out pick into the response body: the winning resolution's
/// fields at the top level, with the recommendation and the full candidate
/// list as siblings.
fn pick_payload(pick: &ResolutionPick) -> serde_json::Value {
    let mut data = serde_json::json!(pick.best_resolution);
    if let serde_json::Value::Object(map) = &mut data {
        map.insert(
            "recommended_provider".into(),
            serde_json::json!(pick.recommended_provider),
        );
        map.insert("candidates".into(), serde_json::json!(pick.candidates));
    }
    data
}

/// Configured provider names and the master switch.
async fn list_providers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let names = state.providers.names();
    let message = if !state.providers.is_enabled() {
        "AI conflict resolution is disabled"
    } else if names.is_empty() {
        "no providers configured"
    } else {
        "ready"
    };
    ok(serde_json::json!({
        "enabled": state.providers.is_enabled(),
        "providers": names,
        "message": message,
    }))
}

/// Probe every configured provider and report per-provider latency.
async fn test_providers(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let probes = state.providers.test_all().await;
    ok(probes)
}
