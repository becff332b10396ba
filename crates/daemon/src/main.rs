//! PatchGate daemon entry point.
//!
//! Loads configuration, initializes all subsystems, starts the web server,
//! and handles graceful shutdown.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use patchgate_core::config::AppConfig;
use patchgate_core::conflict::ResolutionEngine;
use patchgate_core::db::Database;
use patchgate_core::gerrit::GerritClient;
use patchgate_core::notify::Notifier;
use patchgate_core::orchestrator::Orchestrator;
use patchgate_core::providers::ProviderRegistry;
use patchgate_core::remote::SshExecutor;
use patchgate_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// PatchGate submission pipeline daemon.
#[derive(Parser, Debug)]
#[command(
    name = "patchgate-daemon",
    version,
    about = "Patch submission pipeline daemon"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables in config")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.daemon.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  PatchGate Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file   : {}", args.config.display());
    info!("Gerrit URL    : {}", config.gerrit.base_url);
    info!("Remote nodes  : {}", config.remote.nodes.len());
    info!("AI providers  : {}", config.ai.providers.len());
    info!("Web listen    : {}", config.web.listen);
    info!("Data dir      : {}", config.daemon.data_dir.display());
    info!("Log level     : {}", log_level);
    info!("========================================");

    // Ensure data directory exists
    std::fs::create_dir_all(&config.daemon.data_dir).context("failed to create data directory")?;

    // Initialize database
    let db_path = config.daemon.data_dir.join("patchgate.db");
    let db = Arc::new(Database::new(&db_path).context("failed to open database")?);
    db.initialize()
        .context("failed to initialize database schema")?;
    info!("Database initialized at {}", db_path.display());

    // External clients
    let gerrit = Arc::new(GerritClient::from_config(&config.gerrit));
    let remote_executor = Arc::new(SshExecutor::new());
    let notifier = Arc::new(Notifier::new(&config.notifications));
    if notifier.is_configured() {
        info!("Notifications enabled");
    }

    // AI providers and resolution engine
    let providers = Arc::new(ProviderRegistry::from_config(&config.ai));
    let engine = Arc::new(ResolutionEngine::new(
        Arc::clone(&providers),
        Duration::from_secs(config.ai.request_timeout_secs),
    ));

    // Orchestrator
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&db),
        gerrit,
        remote_executor,
        notifier,
        config.remote.clone(),
        Duration::from_secs(config.gerrit.push_timeout_secs),
    ));
    info!("Orchestrator initialized");

    // Start web server in background
    let web_server = WebServer::new(
        config.clone(),
        Arc::clone(&db),
        orchestrator,
        engine,
        providers,
    );
    let listen_addr = config.web.listen.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.start(&listen_addr).await {
            error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    signals::wait_for_shutdown().await;

    info!("Shutdown signal received, stopping...");

    // In-flight submission tasks keep their own checkpointed state; the
    // next drive of an unfinished submission resumes from the record.
    web_handle.abort();

    info!("PatchGate daemon stopped.");
    Ok(())
}
