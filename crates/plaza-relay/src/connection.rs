//! Per-connection handler: assign an identity, greet, then fan frames out.

use std::net::SocketAddr;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use plaza_common::PeerId;
use plaza_session::Envelope;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::hub::{stamp_frame, PeerHub};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Handle a single WebSocket connection until it closes.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, hub: PeerHub) {
    let (mut sink, mut stream) = ws.split();
    let peer_id = PeerId::generate();

    // 1. Register, then greet. Frames queued in `rx` meanwhile go out after
    //    the welcome.
    let (tx, mut rx) = mpsc::channel::<String>(256);
    hub.register(peer_id.clone(), tx).await;

    // 2. Greet.
    if send_envelope(&mut sink, &Envelope::welcome(peer_id.clone()))
        .await
        .is_err()
    {
        tracing::debug!(remote = %addr, "Client gone before welcome");
        hub.unregister(&peer_id).await;
        return;
    }

    let peers = hub.count().await;
    tracing::info!(remote = %addr, peer = %peer_id, peers, "Client connected");

    // 3. Forwarding loop.
    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match stamp_frame(&peer_id, &text) {
                        Ok(stamped) => {
                            let delivered = hub.broadcast(&peer_id, &stamped).await;
                            tracing::debug!(peer = %peer_id, delivered, "Frame forwarded");
                        }
                        Err(e) => {
                            tracing::warn!(peer = %peer_id, error = %e, "Dropping malformed frame");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %peer_id, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    hub.unregister(&peer_id).await;
    tracing::info!(remote = %addr, peer = %peer_id, "Client disconnected");

    match Envelope::peer_disconnected(peer_id.clone()).encode() {
        Ok(notice) => {
            hub.broadcast(&peer_id, &notice).await;
        }
        Err(e) => tracing::warn!(peer = %peer_id, error = %e, "Failed to encode disconnect notice"),
    }
}

async fn send_envelope(
    sink: &mut WsSink,
    envelope: &Envelope,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = envelope
        .encode()
        .map_err(|e| tokio_tungstenite::tungstenite::Error::Io(std::io::Error::other(e)))?;
    sink.send(Message::Text(json.into())).await
}
