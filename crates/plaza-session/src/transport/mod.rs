//! Transport Channel: a persistent WebSocket connection to the relay.
//!
//! Connects with a handshake timeout, waits for the relay's `welcome`
//! frame to learn the local peer identity, decodes inbound envelopes, and
//! reconnects after a fixed delay on unexpected closure until
//! [`TransportClient::disconnect`] is called.

mod client;
mod connection;
mod types;

pub use client::TransportClient;
pub use types::{TransportConfig, TransportEvent};
