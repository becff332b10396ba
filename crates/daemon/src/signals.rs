//! Shutdown signal handling for the daemon.

use tracing::info;

/// Block until SIGTERM or Ctrl+C (SIGINT) arrives.
///
/// Returning hands control back to `main`, which stops the web server and
/// lets in-flight submission tasks be abandoned.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(signal, "shutdown signal received, stopping daemon");
}
