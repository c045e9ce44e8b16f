//! Hub startup helper for embedding in the engine binary.
//!
//! Provides [`spawn_hub`], which binds the listener eagerly and then runs
//! the HTTP + `WebSocket` server on a background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use worldpulse_hub::startup::spawn_hub;
//! use worldpulse_hub::state::HubState;
//!
//! let state = Arc::new(HubState::default());
//! let shutdown = CancellationToken::new();
//! let hub = spawn_hub(&config.server, state, shutdown.clone()).await?;
//! // ... on exit:
//! shutdown.cancel();
//! hub.handle.await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use worldpulse_core::config::HubConfig;

use crate::server::{ServerError, bind, serve};
use crate::state::HubState;

/// Errors that can occur when spawning the hub.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A hub running on a background task.
pub struct SpawnedHub {
    /// The server task; completes after the shutdown token is cancelled.
    pub handle: JoinHandle<()>,
    /// The bound address (useful when the configured port is 0).
    pub addr: SocketAddr,
}

/// Spawn the hub server on a background Tokio task.
///
/// The listener is bound before this returns, so an address in use is
/// reported here rather than from the background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the server cannot bind to the
/// requested address.
pub async fn spawn_hub(
    config: &HubConfig,
    state: Arc<HubState>,
    shutdown: CancellationToken,
) -> Result<SpawnedHub, StartupError> {
    let listener = bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;
    let cors_origin = config.cors_origin.clone();

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state, &cors_origin, shutdown).await {
            tracing::error!(error = %e, "Hub server exited with error");
        }
    });

    tracing::info!(%addr, "Hub spawned on background task");

    Ok(SpawnedHub { handle, addr })
}
