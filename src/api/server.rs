//! HTTP server lifecycle
//!
//! Serves a router on a bound listener until `stop` is called, then lets
//! in-flight requests finish.

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// HTTP server for the ranking API
pub struct ApiServer {
    router: Router,
    shutdown_tx: watch::Sender<bool>,
}

impl ApiServer {
    pub fn new(router: Router) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            router,
            shutdown_tx,
        }
    }

    /// Serve on `listener` until stopped
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!("API server listening on http://{}", addr);

        // A stop issued before this point is still observed
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stopped| *stopped).await;
                info!("API server shutdown signal received");
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    /// Stop accepting new connections
    pub fn stop(&self) {
        info!("Stopping API server...");
        if self.shutdown_tx.send_replace(true) {
            warn!("API server was already stopping");
        }
    }
}
