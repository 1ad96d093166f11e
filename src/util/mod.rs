use std::future::Future;
use std::io;

use tracing::error;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_log() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves when `signal` fires. If the signal handler could not be
/// installed this never resolves, so the caller keeps running.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Ctrl-C as a shutdown future for [`crate::RelayServer::run_until`].
pub async fn ctrl_c() {
    shutdown_on(tokio::signal::ctrl_c()).await
}
