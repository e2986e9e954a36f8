use super::ServiceResult;
use super::manager::ServiceManager;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

/// Run until a shutdown signal arrives or any service exits, then stop the
/// rest within `timeout`.
///
/// A service exiting on its own is treated as a failure: every service is
/// expected to live for the whole process.
pub async fn handle_shutdown_signals(mut manager: ServiceManager, timeout: Duration) -> ExitCode {
    let exit_code = tokio::select! {
        (name, result) = manager.wait_for_exit() => {
            match result {
                ServiceResult::Completed => {
                    warn!(service = name, "service exited unexpectedly, shutting down");
                }
                ServiceResult::Failed(e) => {
                    error!(service = name, error = ?e, "service failed, shutting down");
                }
                ServiceResult::Panicked(reason) => {
                    error!(service = name, reason = %reason, "service panicked, shutting down");
                }
            }
            ExitCode::FAILURE
        }
        signal = shutdown_signal() => {
            info!(signal, "shutdown signal received");
            ExitCode::SUCCESS
        }
    };

    let pending = manager.shutdown(timeout).await;
    if !pending.is_empty() {
        warn!(services = ?pending, "forced shutdown of unresponsive services");
        return ExitCode::FAILURE;
    }
    exit_code
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
