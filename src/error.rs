//! Relay error types

use std::net::SocketAddr;

use tokio_tungstenite::tungstenite;

/// Errors surfaced by the relay. Per-link failures stay inside the link's
/// task; only start-up problems reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("status endpoint on {addr} failed to start: {reason}")]
    Status { addr: SocketAddr, reason: String },
}

pub type Result<T> = std::result::Result<T, RelayError>;
