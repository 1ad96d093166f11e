//! Relay configuration and command line

use std::net::SocketAddr;

use clap::{Parser, Subcommand, ValueEnum};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:8080";

/// Relay server options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket listening address
    pub bind_addr: SocketAddr,

    /// HTTP status endpoint address (None = disabled)
    pub status_addr: Option<SocketAddr>,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            status_addr: None,
            tcp_nodelay: true,
        }
    }
}

impl RelayConfig {
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn status(mut self, addr: SocketAddr) -> Self {
        self.status_addr = Some(addr);
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[derive(Debug, Parser)]
#[command(name = "rover-signal", version, about = "Broadcaster/viewer signaling relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the signaling relay
    Server(ServerArgs),
    /// Connect to a relay as a diagnostic peer
    Peer(PeerArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    /// Address to accept WebSocket connections on
    #[arg(long, env = "ROVER_SIGNAL_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Address for the HTTP status endpoint
    #[arg(long, env = "ROVER_SIGNAL_STATUS_BIND")]
    pub status_bind: Option<SocketAddr>,
}

impl From<ServerArgs> for RelayConfig {
    fn from(args: ServerArgs) -> Self {
        RelayConfig {
            bind_addr: args.bind,
            status_addr: args.status_bind,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeerRole {
    Viewer,
    Broadcaster,
}

impl PeerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerRole::Viewer => "viewer",
            PeerRole::Broadcaster => "broadcaster",
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct PeerArgs {
    /// Relay WebSocket URL
    #[arg(long, env = "ROVER_SIGNAL_URL", default_value = DEFAULT_RELAY_URL)]
    pub url: String,

    /// Role to announce after connecting
    #[arg(long, value_enum, default_value_t = PeerRole::Viewer)]
    pub role: PeerRole,
}
