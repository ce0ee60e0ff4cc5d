//! Types, configuration, and events for call signaling.

use plaza_common::PeerId;

use crate::protocol::IceCandidatePayload;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Negotiation state of one call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    Connected,
    Closed,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::OfferSent => "offer-sent",
            CallState::OfferReceived => "offer-received",
            CallState::AnswerSent => "answer-sent",
            CallState::Connected => "connected",
            CallState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-peer call record.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSession {
    pub peer_id: PeerId,
    pub state: CallState,
    /// `true` when the local side sent the offer.
    pub initiator: bool,
    /// Last local description sent, kept until the remote side answers.
    pub pending_description: Option<String>,
    pub remote_candidates: u32,
}

impl CallSession {
    pub(crate) fn new(peer_id: PeerId, initiator: bool) -> Self {
        Self {
            peer_id,
            state: CallState::Idle,
            initiator,
            pending_description: None,
            remote_candidates: 0,
        }
    }
}

/// Connectivity reported by the media layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

/// A network-path candidate, without the addressing the wire adds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u32>,
}

impl IceCandidate {
    pub(crate) fn into_payload(self, target_id: PeerId) -> IceCandidatePayload {
        IceCandidatePayload {
            target_id,
            candidate: self.candidate,
            sdp_mid: self.sdp_mid,
            sdp_m_line_index: self.sdp_m_line_index,
        }
    }
}

impl From<IceCandidatePayload> for IceCandidate {
    fn from(payload: IceCandidatePayload) -> Self {
        Self {
            candidate: payload.candidate,
            sdp_mid: payload.sdp_mid,
            sdp_m_line_index: payload.sdp_m_line_index,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted by the call relay for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    StateChanged { peer_id: PeerId, state: CallState },
    /// The session was torn down and its media resources released.
    Ended { peer_id: PeerId },
    /// The media layer failed a negotiation step.
    Failed { peer_id: PeerId, reason: String },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Whether voice is wired up at all.
    pub enabled: bool,
    /// Offer to newcomers automatically; otherwise wait for `start_call`.
    pub auto_start: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_start: true,
        }
    }
}
