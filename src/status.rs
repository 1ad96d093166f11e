//! HTTP status endpoint
//!
//! Serves `GET /status` with the current registry snapshot. Runs on its own
//! thread so it never competes with the relay's runtime.

use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use rouille::{Request, Response, Server};
use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::registry::Registry;

pub struct StatusServer {
    addr: SocketAddr,
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StatusServer {
    pub fn spawn(addr: SocketAddr, registry: Arc<Registry>) -> Result<StatusServer> {
        let server = Server::new(addr, move |request| status_request(request, &registry))
            .map_err(|e| RelayError::Status {
                addr,
                reason: e.to_string(),
            })?;

        let addr = server.server_addr();
        info!("Status endpoint on http://{}/status", addr);

        let (handle, stop) = server.stoppable();

        Ok(StatusServer {
            addr,
            stop,
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn status_request(request: &Request, registry: &Registry) -> Response {
    debug!("{} {}", request.method(), request.url());

    match (request.method(), request.url().as_str()) {
        ("GET", "/status") => Response::json(&registry.snapshot()),
        _ => Response::empty_404(),
    }
}
