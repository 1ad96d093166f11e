//! Connection registry
//!
//! Tracks which link is the broadcaster and which links are viewers. All
//! reads and writes go through one mutex; nothing inside the critical section
//! does I/O, callers clone the `Arc<PeerLink>` handles they need and send
//! after the lock is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::model::client::{ClientId, LinkState, PeerLink};

/// Role a link has announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Broadcaster,
    Viewer,
}

#[derive(Debug, Default)]
struct Roles {
    broadcaster: Option<Arc<PeerLink>>,
    viewers: HashMap<ClientId, Arc<PeerLink>>,
}

impl Roles {
    fn is_broadcaster(&self, id: ClientId) -> bool {
        self.broadcaster.as_ref().is_some_and(|b| b.id == id)
    }
}

/// Consistent copy of the registry taken under a single lock.
#[derive(Debug, Clone, Default)]
pub struct RoleView {
    pub broadcaster: Option<Arc<PeerLink>>,
    pub viewers: Vec<Arc<PeerLink>>,
}

/// Serializable registry summary, served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub broadcaster: Option<PeerInfo>,
    pub viewers: Vec<PeerInfo>,
    pub viewer_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerInfo {
    pub id: ClientId,
    pub addr: String,
    pub connected_at: DateTime<Utc>,
    pub state: LinkState,
}

impl From<&PeerLink> for PeerInfo {
    fn from(link: &PeerLink) -> Self {
        PeerInfo {
            id: link.id,
            addr: link.addr.to_string(),
            connected_at: link.connected_at,
            state: link.state(),
        }
    }
}

/// Single broadcaster plus a set of viewers.
///
/// A link holds at most one role. Every operation is idempotent and none of
/// them fail.
#[derive(Debug, Default)]
pub struct Registry {
    roles: Mutex<Roles>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `link` the broadcaster, replacing any previous one.
    ///
    /// The displaced link is returned but not told anything; it stays
    /// connected without a role. If `link` was a viewer it stops being one.
    pub fn set_broadcaster(&self, link: &Arc<PeerLink>) -> Option<Arc<PeerLink>> {
        let mut roles = self.roles.lock();

        roles.viewers.remove(&link.id);
        let previous = roles.broadcaster.replace(Arc::clone(link));

        previous.filter(|p| p.id != link.id)
    }

    /// Clears the broadcaster slot if `link` holds it.
    pub fn clear_if_broadcaster(&self, link: &PeerLink) -> bool {
        let mut roles = self.roles.lock();

        if roles.is_broadcaster(link.id) {
            roles.broadcaster = None;
            true
        } else {
            false
        }
    }

    /// Adds `link` to the viewers. A broadcaster re-announcing as viewer
    /// gives up the broadcaster slot.
    pub fn add_viewer(&self, link: &Arc<PeerLink>) -> bool {
        let mut roles = self.roles.lock();

        if roles.is_broadcaster(link.id) {
            roles.broadcaster = None;
        }

        roles.viewers.insert(link.id, Arc::clone(link)).is_none()
    }

    pub fn remove_viewer(&self, link: &PeerLink) -> bool {
        self.roles.lock().viewers.remove(&link.id).is_some()
    }

    /// Evicts `link` from every role. Returns the role it held, if any.
    pub fn remove(&self, link: &PeerLink) -> Option<Role> {
        let mut roles = self.roles.lock();

        if roles.is_broadcaster(link.id) {
            roles.broadcaster = None;
            return Some(Role::Broadcaster);
        }

        roles.viewers.remove(&link.id).map(|_| Role::Viewer)
    }

    pub fn broadcaster(&self) -> Option<Arc<PeerLink>> {
        self.roles.lock().broadcaster.clone()
    }

    pub fn viewers(&self) -> Vec<Arc<PeerLink>> {
        self.roles.lock().viewers.values().cloned().collect()
    }

    pub fn viewer_count(&self) -> usize {
        self.roles.lock().viewers.len()
    }

    pub fn role_of(&self, link: &PeerLink) -> Option<Role> {
        let roles = self.roles.lock();

        if roles.is_broadcaster(link.id) {
            Some(Role::Broadcaster)
        } else if roles.viewers.contains_key(&link.id) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Broadcaster and viewers read together.
    pub fn view(&self) -> RoleView {
        let roles = self.roles.lock();

        RoleView {
            broadcaster: roles.broadcaster.clone(),
            viewers: roles.viewers.values().cloned().collect(),
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let view = self.view();

        let mut viewers: Vec<PeerInfo> =
            view.viewers.iter().map(|v| PeerInfo::from(&**v)).collect();
        viewers.sort_by_key(|v| *v.id);

        RegistrySnapshot {
            broadcaster: view.broadcaster.as_deref().map(PeerInfo::from),
            viewer_count: viewers.len(),
            viewers,
        }
    }
}
