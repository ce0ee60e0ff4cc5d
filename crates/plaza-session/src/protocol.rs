//! Wire protocol for the plaza session layer.
//!
//! Every frame on the relay connection is one JSON [`Envelope`]
//! `{ "type", "senderId", "data" }`, where `data` is itself a JSON-encoded
//! payload whose shape depends on `type`. The payload structs below use
//! camelCase field names on the wire.

use std::fmt;
use std::str::FromStr;

use plaza_common::{PeerId, RoomCode, SessionError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::pose::AvatarPose;

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// Message type tags carried in `Envelope::message_type`.
pub mod message_types {
    pub const WELCOME: &str = "welcome";
    pub const PEER_DISCONNECTED: &str = "peer-disconnected";
    pub const ROOM_AVAILABLE: &str = "room-available";
    pub const ROOM_CLOSED: &str = "room-closed";
    pub const ROOM_JOIN: &str = "room-join";
    pub const ROOM_WELCOME: &str = "room-welcome";
    pub const ROOM_LEAVE: &str = "room-leave";
    pub const ROOM_LIST_REQUEST: &str = "room-list-request";
    pub const ROOM_LIST: &str = "room-list";
    pub const ROOM_TELEPORT: &str = "room-teleport";
    pub const PLAYER_NAME_UPDATE: &str = "player-name-update";
    pub const VR_POSITION: &str = "vr-position";
    pub const WEBRTC_OFFER: &str = "webrtc-offer";
    pub const WEBRTC_ANSWER: &str = "webrtc-answer";
    pub const WEBRTC_ICE_CANDIDATE: &str = "webrtc-ice-candidate";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One frame on the relay connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub sender_id: PeerId,
    /// JSON-encoded payload.
    #[serde(default)]
    pub data: String,
}

impl Envelope {
    pub fn new(message_type: impl Into<String>, sender_id: PeerId, data: String) -> Self {
        Self {
            message_type: message_type.into(),
            sender_id,
            data,
        }
    }

    /// Self-addressed handshake frame assigning `peer_id`.
    pub fn welcome(peer_id: PeerId) -> Self {
        Self::new(message_types::WELCOME, peer_id, "{}".to_string())
    }

    /// Relay notice that `peer_id` dropped its connection.
    pub fn peer_disconnected(peer_id: PeerId) -> Self {
        Self::new(message_types::PEER_DISCONNECTED, peer_id, "{}".to_string())
    }

    /// Decode a text frame. Failures are per-frame and never fatal.
    pub fn decode(frame: &str) -> Result<Self, SessionError> {
        serde_json::from_str(frame).map_err(|e| SessionError::malformed("envelope", e))
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode the nested `data` payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        if self.data.trim().is_empty() {
            return Err(SessionError::malformed(&self.message_type, "empty payload"));
        }
        serde_json::from_str(&self.data).map_err(|e| SessionError::malformed(&self.message_type, e))
    }

    pub fn is_welcome(&self) -> bool {
        self.message_type == message_types::WELCOME
    }
}

// ---------------------------------------------------------------------------
// Room kinds
// ---------------------------------------------------------------------------

/// Predefined area categories. Used both for a room's kind and for the
/// sub-area a peer currently occupies inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    #[default]
    Lobby,
    MeetingRoom,
    Auditorium,
    Gallery,
    Lounge,
}

impl RoomKind {
    pub const ALL: [RoomKind; 5] = [
        RoomKind::Lobby,
        RoomKind::MeetingRoom,
        RoomKind::Auditorium,
        RoomKind::Gallery,
        RoomKind::Lounge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoomKind::Lobby => "Lobby",
            RoomKind::MeetingRoom => "MeetingRoom",
            RoomKind::Auditorium => "Auditorium",
            RoomKind::Gallery => "Gallery",
            RoomKind::Lounge => "Lounge",
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomKind {
    type Err = String;

    /// Case-insensitive; `-`, `_` and spaces are ignored ("meeting-room").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        RoomKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown room kind: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Room payloads
// ---------------------------------------------------------------------------

/// Advertisement of a hosted room (`room-available`, entries of `room-list`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomCode,
    pub host_id: PeerId,
    pub room_name: String,
    pub room_type: RoomKind,
    pub player_count: u32,
    pub max_players: u32,
}

impl RoomInfo {
    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedPayload {
    pub room_id: RoomCode,
    pub host_id: PeerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinPayload {
    pub room_id: RoomCode,
    pub player_id: PeerId,
    pub player_name: String,
}

/// One roster line inside `room-welcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PeerId,
    pub player_name: String,
    #[serde(default)]
    pub is_host: bool,
    /// Sub-area the player currently occupies.
    pub room_type: RoomKind,
}

/// Host's roster snapshot for a newly joined guest. Broadcast on the wire,
/// addressed through `target_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomWelcomePayload {
    pub room_id: RoomCode,
    pub target_id: PeerId,
    pub room_type: RoomKind,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub max_players: u32,
    pub players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomLeavePayload {
    pub room_id: RoomCode,
    pub player_id: PeerId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomListRequestPayload {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomListPayload {
    pub rooms: Vec<RoomInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTeleportPayload {
    pub room_id: RoomCode,
    pub player_id: PeerId,
    pub target_room_type: RoomKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerNameUpdatePayload {
    pub room_id: RoomCode,
    pub player_id: PeerId,
    pub player_name: String,
}

// ---------------------------------------------------------------------------
// Pose payload
// ---------------------------------------------------------------------------

/// High-frequency pose snapshot (`vr-position`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrPositionPayload {
    pub room_id: RoomCode,
    pub room_type: RoomKind,
    #[serde(flatten)]
    pub pose: AvatarPose,
}

// ---------------------------------------------------------------------------
// Call signaling payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// `webrtc-offer` / `webrtc-answer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptionPayload {
    pub target_id: PeerId,
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: SdpKind,
}

/// `webrtc-ice-candidate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidatePayload {
    pub target_id: PeerId,
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        default,
        rename = "sdpMLineIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_m_line_index: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_wire_field_names() {
        let env = Envelope::new(
            message_types::ROOM_LEAVE,
            PeerId::from("p1"),
            r#"{"roomId":"ABC234","playerId":"p1"}"#.to_string(),
        );
        let json: serde_json::Value = serde_json::from_str(&env.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "room-leave");
        assert_eq!(json["senderId"], "p1");
        assert!(json["data"].is_string());
    }

    #[test]
    fn envelope_payload_decodes_nested_json() {
        let frame = r#"{"type":"room-leave","senderId":"p1","data":"{\"roomId\":\"ABC234\",\"playerId\":\"p1\"}"}"#;
        let env = Envelope::decode(frame).unwrap();
        let leave: RoomLeavePayload = env.payload().unwrap();
        assert_eq!(leave.room_id.as_str(), "ABC234");
        assert_eq!(leave.player_id, PeerId::from("p1"));
    }

    #[test]
    fn empty_payload_is_malformed() {
        let env = Envelope::new(message_types::WEBRTC_OFFER, PeerId::from("p1"), String::new());
        let err = env.payload::<SessionDescriptionPayload>().unwrap_err();
        assert!(matches!(err, SessionError::MalformedPayload { ref message_type, .. } if message_type == "webrtc-offer"));
    }

    #[test]
    fn garbage_frame_is_malformed() {
        assert!(matches!(
            Envelope::decode("not json"),
            Err(SessionError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn welcome_is_self_addressed() {
        let env = Envelope::welcome(PeerId::from("me"));
        assert!(env.is_welcome());
        assert_eq!(env.sender_id, PeerId::from("me"));
    }

    #[test]
    fn room_kind_parses_loosely() {
        assert_eq!("lobby".parse::<RoomKind>().unwrap(), RoomKind::Lobby);
        assert_eq!(
            "meeting-room".parse::<RoomKind>().unwrap(),
            RoomKind::MeetingRoom
        );
        assert!("kitchen".parse::<RoomKind>().is_err());
    }

    #[test]
    fn room_kind_serializes_by_name() {
        assert_eq!(
            serde_json::to_string(&RoomKind::MeetingRoom).unwrap(),
            "\"MeetingRoom\""
        );
    }

    #[test]
    fn vr_position_is_flat_on_the_wire() {
        let payload = VrPositionPayload {
            room_id: RoomCode::from_normalized("ABC234"),
            room_type: RoomKind::Gallery,
            pose: AvatarPose::default(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["roomId"], "ABC234");
        assert_eq!(json["roomType"], "Gallery");
        assert!(json.get("rootPosition").is_some());
        assert!(json.get("rightHand").is_some());
    }

    #[test]
    fn ice_candidate_field_names() {
        let payload = IceCandidatePayload {
            target_id: PeerId::from("p2"),
            candidate: "candidate:1 1 udp 1 10.0.0.1 5000 typ host".into(),
            sdp_mid: Some("0".into()),
            sdp_m_line_index: Some(0),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["targetId"], "p2");
        assert_eq!(json["sdpMid"], "0");
        assert_eq!(json["sdpMLineIndex"], 0);
    }

    #[test]
    fn session_description_kind_is_lowercase() {
        let payload = SessionDescriptionPayload {
            target_id: PeerId::from("p2"),
            sdp: "v=0".into(),
            kind: SdpKind::Answer,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "answer");
    }
}
