//! PatchGate web server and REST API.
//!
//! Provides an Axum-based HTTP server with:
//! - Patch upload endpoint (multipart)
//! - Submission creation and status polling
//! - AI conflict-resolution endpoints
//! - Health check

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use patchgate_core::config::AppConfig;
use patchgate_core::conflict::ResolutionEngine;
use patchgate_core::db::Database;
use patchgate_core::orchestrator::Orchestrator;
use patchgate_core::providers::ProviderRegistry;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: Arc<Database>,
    pub orchestrator: Arc<Orchestrator>,
    pub engine: Arc<ResolutionEngine>,
    pub providers: Arc<ProviderRegistry>,
    pub config: AppConfig,
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(
        config: AppConfig,
        db: Arc<Database>,
        orchestrator: Arc<Orchestrator>,
        engine: Arc<ResolutionEngine>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        let state = Arc::new(AppState {
            db,
            orchestrator,
            engine,
            providers,
            config,
        });
        Self { state }
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;

        // Permissive CORS; this service sits behind an internal proxy.
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);

        let max_upload = self.state.config.web.max_upload_bytes;
        let app = Router::new()
            .merge(api::upload::routes())
            .merge(api::submit::routes())
            .merge(api::status::routes())
            .merge(api::ai::routes())
            .layer(DefaultBodyLimit::max(max_upload))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
