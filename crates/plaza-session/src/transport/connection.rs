//! Background WebSocket connection loop with fixed-delay reconnect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use plaza_common::{PeerId, TransportError};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::protocol::Envelope;

use super::types::{SharedState, TransportCommand, TransportConfig, TransportEvent};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// How a connected session ended.
enum SessionOutcome {
    /// Local disconnect or the client handle was dropped.
    Shutdown,
    /// Unexpected closure; eligible for reconnect.
    Lost(String),
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task owning the socket.
///
/// The first attempt reports its outcome through `ready_tx` and gives up on
/// failure; once a connection has succeeded, later losses are retried after
/// `reconnect_delay` for as long as auto-reconnect stays enabled.
pub(crate) async fn connection_loop(
    config: TransportConfig,
    shared: Arc<SharedState>,
    event_tx: mpsc::Sender<TransportEvent>,
    mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
    ready_tx: oneshot::Sender<Result<PeerId, TransportError>>,
) {
    let mut ready_tx = Some(ready_tx);

    loop {
        info!(url = %config.url, "Connecting to relay");

        let attempt = tokio::time::timeout(config.connect_timeout, open_session(&config.url)).await;
        let failure = match attempt {
            Ok(Ok((ws, welcome))) => {
                let peer_id = welcome.sender_id.clone();
                shared.mark_connected(peer_id.clone());
                info!(peer = %peer_id, "Relay handshake complete");

                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(Ok(peer_id.clone()));
                }
                let _ = event_tx.send(TransportEvent::Connected { peer_id }).await;
                let _ = event_tx.send(TransportEvent::Message(welcome)).await;

                let outcome = run_session(ws, &mut command_rx, &event_tx).await;
                shared.mark_disconnected();
                let _ = event_tx.send(TransportEvent::Disconnected).await;

                match outcome {
                    SessionOutcome::Shutdown => {
                        info!("Relay connection closed");
                        return;
                    }
                    SessionOutcome::Lost(reason) => {
                        warn!(reason = %reason, "Relay connection lost");
                        None
                    }
                }
            }
            Ok(Err(e)) => Some(e),
            Err(_elapsed) => Some(TransportError::HandshakeTimeout(config.connect_timeout)),
        };

        if let Some(e) = failure {
            error!(error = %e, "Failed to connect to relay");
            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(Err(e));
                return;
            }
            let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
        }

        if !shared.auto_reconnect() {
            return;
        }

        info!(
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "Reconnecting after fixed delay"
        );
        if !wait_for_reconnect(&config, &mut command_rx).await {
            return;
        }
    }
}

/// Sleep out the reconnect delay. Frames queued meanwhile are dropped.
/// Returns `false` if a disconnect was requested.
async fn wait_for_reconnect(
    config: &TransportConfig,
    command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
) -> bool {
    let sleep = tokio::time::sleep(config.reconnect_delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = command_rx.recv() => match cmd {
                Some(TransportCommand::Send(_)) => {
                    debug!("Dropping outbound frame while reconnecting");
                }
                Some(TransportCommand::Disconnect) | None => return false,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Open the socket and wait for the relay's `welcome` frame.
async fn open_session(url: &str) -> Result<(WsStream, Envelope), TransportError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match Envelope::decode(&text) {
                Ok(envelope) if envelope.is_welcome() => return Ok((ws, envelope)),
                Ok(envelope) => {
                    debug!(message_type = %envelope.message_type, "Frame before welcome dropped");
                }
                Err(e) => warn!(error = %e, "Malformed frame during handshake"),
            },
            Ok(WsMessage::Close(_)) => {
                return Err(TransportError::Connection(
                    "relay closed during handshake".to_string(),
                ));
            }
            Err(e) => return Err(TransportError::Connection(e.to_string())),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn run_session(
    ws: WsStream,
    command_rx: &mut mpsc::UnboundedReceiver<TransportCommand>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> SessionOutcome {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(TransportCommand::Send(frame)) => {
                    if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                        return SessionOutcome::Lost(format!("send failed: {e}"));
                    }
                }
                Some(TransportCommand::Disconnect) | None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return SessionOutcome::Shutdown;
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match Envelope::decode(&text) {
                    Ok(envelope) => {
                        if event_tx.send(TransportEvent::Message(envelope)).await.is_err() {
                            return SessionOutcome::Shutdown;
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed frame"),
                },
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = sink.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return SessionOutcome::Lost("closed by relay".to_string());
                }
                Some(Err(e)) => return SessionOutcome::Lost(e.to_string()),
                _ => {}
            },
        }
    }
}
