use std::path::PathBuf;
use std::time::Duration;

use crate::id::{PeerId, RoomCode};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("transport closed")]
    Closed,
}

/// Failures surfaced by the session layer. Every variant is recoverable;
/// the worst case is a stuck state cleared by a manual leave or reconnect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not connected to the relay")]
    NotConnected,

    #[error("already in room {0}")]
    AlreadyInRoom(RoomCode),

    #[error("not in a room")]
    NotInRoom,

    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("room {code} is full ({capacity} players)")]
    RoomFull { code: RoomCode, capacity: u32 },

    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    #[error("peer {0} not found")]
    PeerNotFound(PeerId),

    #[error("malformed {message_type} payload: {reason}")]
    MalformedPayload { message_type: String, reason: String },

    #[error("no welcome from the host of room {0}")]
    JoinTimedOut(RoomCode),

    #[error("room {0} was closed")]
    RoomClosed(RoomCode),

    #[error("voice is disabled")]
    VoiceDisabled,
}

impl SessionError {
    pub fn malformed(message_type: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            message_type: message_type.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlazaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
