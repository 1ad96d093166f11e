//! Signaling relay for one broadcaster and any number of viewers.
//!
//! Peers connect over WebSocket and announce themselves as `broadcaster` or
//! `viewer`. Offers, answers and ICE candidates are then passed between them
//! untouched; media never flows through the relay.

pub mod config;
pub mod error;
pub mod model;
pub mod peer;
pub mod registry;
pub mod router;
pub mod server;
pub mod status;
pub mod util;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use registry::{Registry, Role};
pub use router::{Routed, Router};
pub use server::RelayServer;
