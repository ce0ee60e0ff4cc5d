//! Peer hub: maps connected peer identities to their outbound channels.

use std::collections::HashMap;
use std::sync::Arc;

use plaza_common::{PeerId, SessionError};
use plaza_session::Envelope;
use tokio::sync::{mpsc, RwLock};

/// Thread-safe registry of connected peers.
#[derive(Clone, Default)]
pub struct PeerHub {
    peers: Arc<RwLock<HashMap<PeerId, mpsc::Sender<String>>>>,
}

impl PeerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, peer: PeerId, tx: mpsc::Sender<String>) {
        self.peers.write().await.insert(peer, tx);
    }

    /// Returns true if the peer was registered.
    pub async fn unregister(&self, peer: &PeerId) -> bool {
        self.peers.write().await.remove(peer).is_some()
    }

    /// Deliver `frame` to every peer except `from`. Returns the number of
    /// peers the frame was queued for.
    pub async fn broadcast(&self, from: &PeerId, frame: &str) -> usize {
        let targets: Vec<(PeerId, mpsc::Sender<String>)> = self
            .peers
            .read()
            .await
            .iter()
            .filter(|(id, _)| *id != from)
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect();

        let mut delivered = 0;
        for (peer, tx) in targets {
            if tx.send(frame.to_string()).await.is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(peer = %peer, "Peer channel closed");
            }
        }
        delivered
    }

    pub async fn count(&self) -> usize {
        self.peers.read().await.len()
    }
}

/// Rewrite the envelope's `senderId` to the connection's identity.
pub fn stamp_frame(sender: &PeerId, frame: &str) -> Result<String, SessionError> {
    let mut envelope = Envelope::decode(frame)?;
    if envelope.message_type.trim().is_empty() {
        return Err(SessionError::malformed("envelope", "missing type"));
    }
    envelope.sender_id = sender.clone();
    envelope
        .encode()
        .map_err(|e| SessionError::malformed(&envelope.message_type, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let hub = PeerHub::new();
        let (a_tx, mut a_rx) = mpsc::channel(8);
        let (b_tx, mut b_rx) = mpsc::channel(8);
        let (c_tx, mut c_rx) = mpsc::channel(8);
        hub.register(PeerId::from("a"), a_tx).await;
        hub.register(PeerId::from("b"), b_tx).await;
        hub.register(PeerId::from("c"), c_tx).await;

        let delivered = hub.broadcast(&PeerId::from("a"), "hello").await;
        assert_eq!(delivered, 2);
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap(), "hello");
        assert_eq!(c_rx.try_recv().unwrap(), "hello");
    }

    #[tokio::test]
    async fn unregister_removes_peer() {
        let hub = PeerHub::new();
        let (tx, _rx) = mpsc::channel(8);
        hub.register(PeerId::from("a"), tx).await;
        assert_eq!(hub.count().await, 1);

        assert!(hub.unregister(&PeerId::from("a")).await);
        assert!(!hub.unregister(&PeerId::from("a")).await);
        assert_eq!(hub.count().await, 0);
    }

    #[tokio::test]
    async fn closed_channel_is_not_counted() {
        let hub = PeerHub::new();
        let (tx, rx) = mpsc::channel(8);
        hub.register(PeerId::from("gone"), tx).await;
        drop(rx);

        assert_eq!(hub.broadcast(&PeerId::from("a"), "x").await, 0);
    }

    #[test]
    fn stamp_overrides_claimed_sender() {
        let frame = r#"{"type":"room-leave","senderId":"mallory","data":"{}"}"#;
        let stamped = stamp_frame(&PeerId::from("alice"), frame).unwrap();
        let env = Envelope::decode(&stamped).unwrap();
        assert_eq!(env.sender_id, PeerId::from("alice"));
        assert_eq!(env.message_type, "room-leave");
        assert_eq!(env.data, "{}");
    }

    #[test]
    fn stamp_fills_missing_sender() {
        let frame = r#"{"type":"room-list-request","data":"{}"}"#;
        let stamped = stamp_frame(&PeerId::from("bob"), frame).unwrap();
        assert_eq!(
            Envelope::decode(&stamped).unwrap().sender_id,
            PeerId::from("bob")
        );
    }

    #[test]
    fn stamp_rejects_garbage() {
        assert!(matches!(
            stamp_frame(&PeerId::from("a"), "not json"),
            Err(SessionError::MalformedPayload { .. })
        ));
        assert!(stamp_frame(&PeerId::from("a"), r#"{"type":"","data":"{}"}"#).is_err());
    }
}
