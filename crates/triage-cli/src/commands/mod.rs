pub mod init;
pub mod serve;
pub mod show;
pub mod watch;

use crate::config::TriageConfig;
use std::future::Future;
use std::path::PathBuf;
use std::process;

/// Load the config file (if any) or exit with an error.
pub fn load_config_or_exit(path: Option<&PathBuf>) -> TriageConfig {
    TriageConfig::load(path.map(PathBuf::as_path)).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn exit_on_err<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

/// Resolves on ctrl-c, or on SIGTERM where the platform has it.
///
/// Call from inside the runtime: the SIGTERM handler is registered before
/// this returns, so a signal sent after that point is never missed.
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    #[cfg(unix)]
    let sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for SIGTERM");
            None
        }
    };

    async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match sigterm {
                Some(mut sigterm) => {
                    sigterm.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("ctrl-c received; shutting down"),
            _ = terminate => tracing::info!("SIGTERM received; shutting down"),
        }
    }
}
