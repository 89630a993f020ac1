//! Server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// The peek API server.
#[derive(Clone)]
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Creates a server over the shared state.
    #[must_use]
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// The shared state, for wiring the ingest path to the same store
    /// and broadcaster.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Builds the router without binding, for tests or embedding.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
    }

    /// Serves until the shutdown future completes.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::BindFailed`] when the address cannot be
    /// bound; that is fatal at startup.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        info!(addr = %addr, "server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("server shut down");
        Ok(())
    }
}
