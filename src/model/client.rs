use std::fmt;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Outbound frames waiting for a link's writer task.
pub type Outbound = mpsc::UnboundedReceiver<Arc<str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClientId(u64);

impl Deref for ClientId {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a link as seen by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Open,
    Closing,
    Closed,
}

impl LinkState {
    fn from_u8(v: u8) -> LinkState {
        match v {
            0 => LinkState::Open,
            1 => LinkState::Closing,
            _ => LinkState::Closed,
        }
    }
}

/// The relay's handle on one connected party.
///
/// Sending never touches the socket: frames are queued for the link's writer
/// task, so a slow peer cannot stall whoever is routing to it.
#[derive(Debug)]
pub struct PeerLink {
    pub id: ClientId,
    pub addr: SocketAddr,
    pub connected_at: DateTime<Utc>,
    state: AtomicU8,
    tx: mpsc::UnboundedSender<Arc<str>>,
}

impl PeerLink {
    /// Creates an open link together with the queue its writer drains.
    pub fn open(addr: SocketAddr) -> (Arc<PeerLink>, Outbound) {
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let next_id = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = mpsc::unbounded_channel();
        let link = PeerLink {
            id: ClientId(next_id),
            addr,
            connected_at: Utc::now(),
            state: AtomicU8::new(LinkState::Open as u8),
            tx,
        };

        (Arc::new(link), rx)
    }

    pub fn state(&self) -> LinkState {
        LinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == LinkState::Open
    }

    /// The peer started a close handshake. Only moves forward from `Open`.
    pub fn mark_closing(&self) {
        let _ = self.state.compare_exchange(
            LinkState::Open as u8,
            LinkState::Closing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn mark_closed(&self) {
        self.state.store(LinkState::Closed as u8, Ordering::Release);
    }

    /// Queues `text` for delivery if the link is open.
    ///
    /// Returns whether the frame was queued. A link whose writer is gone is
    /// marked closed.
    pub fn send(&self, text: Arc<str>) -> bool {
        if !self.is_open() {
            return false;
        }

        if self.tx.send(text).is_err() {
            self.mark_closed();
            return false;
        }

        true
    }
}

impl PartialEq for PeerLink {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PeerLink {}

#[cfg(test)]
pub(crate) fn test_link() -> (Arc<PeerLink>, Outbound) {
    PeerLink::open(([127, 0, 0, 1], 9).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let (a, _rx_a) = test_link();
        let (b, _rx_b) = test_link();

        assert_ne!(a.id, b.id);
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_send_queues_when_open() {
        let (link, mut rx) = test_link();

        assert!(link.send(Arc::from("hello")));
        assert_eq!(&*rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_send_skipped_unless_open() {
        let (link, mut rx) = test_link();

        link.mark_closing();
        assert_eq!(link.state(), LinkState::Closing);
        assert!(!link.send(Arc::from("dropped")));

        link.mark_closed();
        assert_eq!(link.state(), LinkState::Closed);
        assert!(!link.send(Arc::from("dropped")));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closing_does_not_reopen_closed_link() {
        let (link, _rx) = test_link();

        link.mark_closed();
        link.mark_closing();

        assert_eq!(link.state(), LinkState::Closed);
    }

    #[test]
    fn test_send_after_writer_gone_closes_link() {
        let (link, rx) = test_link();
        drop(rx);

        assert!(!link.send(Arc::from("lost")));
        assert_eq!(link.state(), LinkState::Closed);
    }
}
