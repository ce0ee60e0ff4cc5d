//! Public handle for the relay connection.

use std::sync::Arc;

use plaza_common::{PeerId, TransportError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::outbound::Outbound;
use crate::protocol::Envelope;

use super::connection::connection_loop;
use super::types::{SharedState, TransportCommand, TransportConfig, TransportEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the relay connection.
///
/// All methods are non-blocking and hand commands to the background
/// connection task.
pub struct TransportClient {
    command_tx: mpsc::UnboundedSender<TransportCommand>,
    shared: Arc<SharedState>,
}

impl TransportClient {
    /// Connect to the relay and wait for the `welcome` handshake.
    ///
    /// Fails with [`TransportError`] if the endpoint is unreachable or the
    /// handshake does not complete within `config.connect_timeout`. On
    /// success returns `(client, event_receiver)`; the first events queued
    /// are `Connected` followed by the `welcome` message itself.
    pub async fn connect(
        config: TransportConfig,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>), TransportError> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let shared = Arc::new(SharedState::new(config.auto_reconnect));

        tokio::spawn(connection_loop(
            config,
            Arc::clone(&shared),
            event_tx,
            command_rx,
            ready_tx,
        ));

        match ready_rx.await {
            Ok(Ok(peer_id)) => {
                info!(peer = %peer_id, "Transport connected");
                Ok((Self { command_tx, shared }, event_rx))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Closed),
        }
    }

    /// Send a typed frame. Best effort: while disconnected the frame is
    /// logged and dropped.
    pub fn send(&self, message_type: &str, data: String) {
        if !self.shared.is_connected() {
            warn!(message_type, "Not connected; dropping outbound message");
            return;
        }
        let sender_id = self.shared.local_id().unwrap_or_default();
        let envelope = Envelope::new(message_type, sender_id, data);
        match envelope.encode() {
            Ok(frame) => {
                debug!(message_type, "Queueing outbound frame");
                if self.command_tx.send(TransportCommand::Send(frame)).is_err() {
                    warn!(message_type, "Connection task gone; dropping outbound message");
                }
            }
            Err(e) => warn!(message_type, error = %e, "Failed to encode envelope"),
        }
    }

    /// Close gracefully and suppress further reconnect attempts.
    pub fn disconnect(&self) {
        self.shared.disable_reconnect();
        let _ = self.command_tx.send(TransportCommand::Disconnect);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Local identity assigned by the relay, if currently connected.
    pub fn local_peer_id(&self) -> Option<PeerId> {
        self.shared.local_id()
    }
}

impl Outbound for TransportClient {
    fn send(&self, message_type: &str, data: String) {
        TransportClient::send(self, message_type, data);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn connect_to_unreachable_endpoint_fails() {
        let config = TransportConfig {
            // Port 9 (discard) on loopback is closed in test environments.
            url: "ws://127.0.0.1:9".to_string(),
            connect_timeout: Duration::from_secs(2),
            reconnect_delay: Duration::from_millis(10),
            auto_reconnect: true,
        };
        let result = TransportClient::connect(config).await;
        assert!(matches!(
            result,
            Err(TransportError::Connection(_)) | Err(TransportError::HandshakeTimeout(_))
        ));
    }

    #[test]
    fn send_while_disconnected_is_dropped() {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let client = TransportClient {
            command_tx,
            shared: Arc::new(SharedState::new(true)),
        };
        client.send("room-list-request", "{}".to_string());
        assert!(command_rx.try_recv().is_err());
    }

    #[test]
    fn send_while_connected_stamps_sender() {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedState::new(true));
        shared.mark_connected(PeerId::from("me"));
        let client = TransportClient { command_tx, shared };

        client.send("room-list-request", "{}".to_string());
        match command_rx.try_recv() {
            Ok(TransportCommand::Send(frame)) => {
                let env = Envelope::decode(&frame).unwrap();
                assert_eq!(env.sender_id, PeerId::from("me"));
                assert_eq!(env.message_type, "room-list-request");
            }
            other => panic!("expected a send command, got {other:?}"),
        }
    }

    #[test]
    fn disconnect_disables_reconnect() {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SharedState::new(true));
        let client = TransportClient {
            command_tx,
            shared: Arc::clone(&shared),
        };
        client.disconnect();
        assert!(!shared.auto_reconnect());
        assert!(matches!(
            command_rx.try_recv(),
            Ok(TransportCommand::Disconnect)
        ));
    }
}
