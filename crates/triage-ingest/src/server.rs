//! Listener setup and graceful shutdown.

use crate::routes::router;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use triage_store::CategoryStore;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

/// Bind `config.bind` and serve until `shutdown` resolves.
pub async fn serve(
    config: &ServerConfig,
    store: Arc<CategoryStore>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.bind,
            source,
        })?;
    serve_with_listener(listener, store, shutdown).await
}

/// Serve on an already-bound listener. In-flight requests finish before
/// this returns.
pub async fn serve_with_listener(
    listener: TcpListener,
    store: Arc<CategoryStore>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let local = listener.local_addr().map_err(ServeError::Serve)?;
    tracing::info!(
        addr = %local,
        store = %store.path().display(),
        categories = store.categories().len(),
        "ingestion server listening"
    );

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServeError::Serve)?;

    tracing::info!(addr = %local, "ingestion server stopped");
    Ok(())
}
