//! Data models for the relay
//!
//! Peer links and the signaling envelopes they carry.

pub mod client;
pub mod message;
