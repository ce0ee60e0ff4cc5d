//! Configuration, shared connection state, and event/command enums.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use plaza_common::PeerId;

use crate::protocol::Envelope;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the relay connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket URL of the relay (e.g., "ws://127.0.0.1:7878").
    pub url: String,
    /// Upper bound for TCP/WebSocket connect plus the `welcome` handshake.
    pub connect_timeout: Duration,
    /// Fixed delay between reconnect attempts. No backoff, no attempt cap.
    pub reconnect_delay: Duration,
    /// Reconnect after an unexpected close.
    pub auto_reconnect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:7878".to_string(),
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(2),
            auto_reconnect: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Handshake completed; raised once per connection.
    Connected { peer_id: PeerId },
    /// Connection lost or closed.
    Disconnected,
    /// A decoded inbound frame, including the initial `welcome`.
    Message(Envelope),
    /// Connect or reconnect attempt failed.
    Error(String),
}

#[derive(Debug)]
pub(crate) enum TransportCommand {
    Send(String),
    Disconnect,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Connection flags shared between the client handle and the background loop.
pub(crate) struct SharedState {
    connected: AtomicBool,
    auto_reconnect: AtomicBool,
    local_id: Mutex<Option<PeerId>>,
}

impl SharedState {
    pub(crate) fn new(auto_reconnect: bool) -> Self {
        Self {
            connected: AtomicBool::new(false),
            auto_reconnect: AtomicBool::new(auto_reconnect),
            local_id: Mutex::new(None),
        }
    }

    pub(crate) fn mark_connected(&self, peer_id: PeerId) {
        if let Ok(mut id) = self.local_id.lock() {
            *id = Some(peer_id);
        }
        self.connected.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut id) = self.local_id.lock() {
            *id = None;
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn local_id(&self) -> Option<PeerId> {
        self.local_id.lock().ok().and_then(|id| id.clone())
    }

    pub(crate) fn auto_reconnect(&self) -> bool {
        self.auto_reconnect.load(Ordering::SeqCst)
    }

    pub(crate) fn disable_reconnect(&self) {
        self.auto_reconnect.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_state_tracks_identity() {
        let state = SharedState::new(true);
        assert!(!state.is_connected());
        assert_eq!(state.local_id(), None);

        state.mark_connected(PeerId::from("p1"));
        assert!(state.is_connected());
        assert_eq!(state.local_id(), Some(PeerId::from("p1")));

        state.mark_disconnected();
        assert!(!state.is_connected());
        assert_eq!(state.local_id(), None);
    }

    #[test]
    fn disable_reconnect_sticks() {
        let state = SharedState::new(true);
        assert!(state.auto_reconnect());
        state.disable_reconnect();
        assert!(!state.auto_reconnect());
    }
}
