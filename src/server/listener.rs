//! TCP Listener
//!
//! Accept loop, one task per connection, and graceful shutdown.

use std::future::Future;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::server::handle_connection;

/// Binds to the configured address and serves until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cache = Cache::new(config.capacity_bytes());

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Cache server listening on {}", listener.local_addr()?);

    serve(listener, cache, config.read_buffer_size, shutdown_signal()).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Each connection runs in its own task sharing `cache`. Accept errors are
/// logged and the loop keeps going.
pub async fn serve<F>(listener: TcpListener, cache: Cache, read_buffer_size: usize, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (socket, peer) = tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        if let Err(e) = socket.set_nodelay(true) {
            debug!(%peer, "failed to set TCP_NODELAY: {}", e);
        }
        debug!(%peer, "connection accepted");

        let cache = cache.clone();
        tokio::spawn(async move {
            match handle_connection(socket, cache, read_buffer_size).await {
                Ok(()) => debug!(%peer, "connection closed"),
                Err(e) => warn!(%peer, "connection error: {}", e),
            }
        });
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
