//! Relay server
//!
//! Accepts TCP connections, upgrades them to WebSocket and runs one task per
//! link. Each link also gets a writer task draining its outbound queue, so
//! routing never waits on a peer's socket.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::model::client::{LinkState, Outbound, PeerLink};
use crate::model::message::Signal;
use crate::registry::{Registry, Role};
use crate::router::Router;
use crate::status::StatusServer;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

pub struct RelayServer {
    config: RelayConfig,
    listener: TcpListener,
    router: Router,
    status: Option<StatusServer>,
}

impl RelayServer {
    /// Binds the listening socket (and the status endpoint, if configured).
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let listener = TcpListener::bind(config.bind_addr).await?;

        let status = match config.status_addr {
            Some(addr) => Some(StatusServer::spawn(addr, Arc::clone(&registry))?),
            None => None,
        };

        Ok(Self {
            config,
            listener,
            router: Router::new(registry),
            status,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn status_addr(&self) -> Option<SocketAddr> {
        self.status.as_ref().map(StatusServer::addr)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.router.registry()
    }

    /// Runs until the process is stopped.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until `shutdown` resolves. Links already accepted keep running.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Signaling relay listening on {}", self.local_addr()?);

        tokio::select! {
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop() => result,
        }
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => self.handle_connection(socket, peer_addr),
                Err(e) => error!("Failed to accept connection: {}", e),
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        debug!("New connection from {}", peer_addr);

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
            }
        }

        let router = self.router.clone();
        tokio::spawn(serve_link(socket, peer_addr, router));
    }
}

/// Lifecycle of one link: handshake, read loop, then eviction.
async fn serve_link(socket: TcpStream, peer_addr: SocketAddr, router: Router) {
    let ws = match accept_async(socket).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer_addr, e);
            return;
        }
    };

    let (link, outbound) = PeerLink::open(peer_addr);
    info!("Client({}) connected from {}", link.id, peer_addr);

    let (sink, mut frames) = ws.split();
    let mut writer = tokio::spawn(write_outbound(Arc::clone(&link), sink, outbound));

    loop {
        let frame = tokio::select! {
            frame = frames.next() => frame,
            // The writer only returns once a send has failed.
            _ = &mut writer => {
                warn!("Client({}) writer stopped, closing link", link.id);
                break;
            }
        };

        let Some(frame) = frame else {
            break;
        };

        match frame {
            Ok(Message::Text(text)) => handle_text(&router, &link, &text),
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => handle_text(&router, &link, &text),
                Err(_) => warn!("Client({}): discarding non UTF-8 binary frame", link.id),
            },
            // Keep reading so the close reply gets flushed; the stream ends
            // once the handshake completes.
            Ok(Message::Close(_)) => link.mark_closing(),
            Ok(_) => {}
            Err(e) => {
                warn!("Client({}) transport error: {}", link.id, e);
                break;
            }
        }
    }

    link.mark_closed();
    match router.registry().remove(&link) {
        Some(Role::Broadcaster) => info!("Broadcaster Client({}) disconnected", link.id),
        Some(Role::Viewer) => info!("Viewer Client({}) disconnected", link.id),
        None => info!("Client({}) disconnected", link.id),
    }

    writer.abort();
}

fn handle_text(router: &Router, link: &Arc<PeerLink>, text: &str) {
    if link.state() == LinkState::Closed {
        return;
    }

    match Signal::parse(text) {
        Ok(signal) => {
            let routed = router.route(link, &signal);
            debug!("Client({}): {} -> {:?}", link.id, signal.kind(), routed);
        }
        Err(e) => warn!("Client({}): {}", link.id, e),
    }
}

async fn write_outbound(link: Arc<PeerLink>, mut sink: WsSink, mut outbound: Outbound) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(text.to_string())).await {
            warn!("Client({}) send failed: {}", link.id, e);
            link.mark_closed();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::client::test_link;

    #[test]
    fn test_closed_link_cannot_take_a_role() {
        let router = Router::new(Arc::new(Registry::new()));
        let (link, _rx) = test_link();

        link.mark_closed();
        handle_text(&router, &link, r#"{"type":"broadcaster"}"#);
        handle_text(&router, &link, r#"{"type":"viewer"}"#);

        assert!(router.registry().broadcaster().is_none());
        assert_eq!(router.registry().viewer_count(), 0);
    }

    #[test]
    fn test_open_link_is_routed() {
        let router = Router::new(Arc::new(Registry::new()));
        let (link, _rx) = test_link();

        handle_text(&router, &link, "not json");
        handle_text(&router, &link, r#"{"type":"broadcaster"}"#);

        assert_eq!(router.registry().role_of(&link), Some(Role::Broadcaster));
    }
}
