//! Signal routing
//!
//! Role announcements update the registry; offers, answers and candidates are
//! forwarded as the exact text received. Recipients are resolved under the
//! registry lock and sent to after it is released.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::model::client::{LinkState, PeerLink};
use crate::model::message::{Signal, SignalKind, VIEWER_CONNECTED};
use crate::registry::{Registry, Role};

/// What the router did with one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Sender took a role. `notified` is set when a viewer join reached the
    /// broadcaster.
    Announced { role: Role, notified: bool },
    /// Envelope queued on this many links.
    Forwarded(usize),
    /// Nobody reachable to receive it.
    Dropped,
    /// Unrouted type tag.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn route(&self, sender: &Arc<PeerLink>, signal: &Signal) -> Routed {
        match signal.kind() {
            SignalKind::Viewer => self.announce_viewer(sender),
            SignalKind::Broadcaster => self.announce_broadcaster(sender),
            SignalKind::Offer => {
                let viewers = self.registry.viewers();
                self.fan_out(sender, &viewers, signal)
            }
            SignalKind::Answer => match self.registry.broadcaster() {
                Some(broadcaster) => self.deliver(sender, &broadcaster, signal),
                None => Routed::Dropped,
            },
            SignalKind::Candidate => {
                let view = self.registry.view();
                match view.broadcaster {
                    Some(ref b) if b.id == sender.id => {
                        self.fan_out(sender, &view.viewers, signal)
                    }
                    Some(ref b) => self.deliver(sender, b, signal),
                    None => Routed::Dropped,
                }
            }
            SignalKind::Other(tag) => {
                debug!("Client({}): ignoring signal type {:?}", sender.id, tag);
                Routed::Ignored
            }
        }
    }

    fn announce_viewer(&self, sender: &Arc<PeerLink>) -> Routed {
        self.registry.add_viewer(sender);
        info!("Client({}) joined as viewer", sender.id);

        let notified = self
            .registry
            .broadcaster()
            .is_some_and(|b| self.forward(&b, Arc::from(VIEWER_CONNECTED)));

        Routed::Announced {
            role: Role::Viewer,
            notified,
        }
    }

    fn announce_broadcaster(&self, sender: &Arc<PeerLink>) -> Routed {
        if let Some(previous) = self.registry.set_broadcaster(sender) {
            info!(
                "Client({}) replaced Client({}) as broadcaster",
                sender.id, previous.id
            );
        } else {
            info!("Client({}) is broadcasting", sender.id);
        }

        Routed::Announced {
            role: Role::Broadcaster,
            notified: false,
        }
    }

    /// Sends to every open target.
    fn fan_out(
        &self,
        sender: &PeerLink,
        targets: &[Arc<PeerLink>],
        signal: &Signal,
    ) -> Routed {
        let delivered = targets
            .iter()
            .filter(|t| self.forward(t, Arc::clone(signal.raw())))
            .count();

        debug!(
            "Client({}): {} forwarded to {}/{} viewers",
            sender.id,
            signal.kind(),
            delivered,
            targets.len()
        );

        Routed::Forwarded(delivered)
    }

    fn deliver(&self, sender: &PeerLink, target: &PeerLink, signal: &Signal) -> Routed {
        if self.forward(target, Arc::clone(signal.raw())) {
            debug!(
                "Client({}): {} forwarded to Client({})",
                sender.id,
                signal.kind(),
                target.id
            );
            Routed::Forwarded(1)
        } else {
            Routed::Dropped
        }
    }

    /// Queues `text` on `target`. A target whose writer has gone is evicted
    /// from the registry on the spot.
    fn forward(&self, target: &PeerLink, text: Arc<str>) -> bool {
        if target.send(text) {
            return true;
        }

        if target.state() == LinkState::Closed {
            if let Some(role) = self.registry.remove(target) {
                warn!(
                    "Client({}) evicted as {:?} after a failed send",
                    target.id, role
                );
            }
        }

        false
    }
}
