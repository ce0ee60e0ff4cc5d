use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use plaza_common::{PeerId, RoomCode, SessionError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::outbound::{send_payload, Outbound};
use crate::protocol::{
    message_types, Envelope, IceCandidatePayload, SdpKind, SessionDescriptionPayload,
};
use crate::room::RoomEvent;

use super::negotiator::{MediaNegotiator, NegotiationError};
use super::types::{CallConfig, CallEvent, CallSession, CallState, IceCandidate, MediaState};

/// Message types the call relay consumes.
pub const SUBSCRIBED_TYPES: &[&str] = &[
    message_types::WEBRTC_OFFER,
    message_types::WEBRTC_ANSWER,
    message_types::WEBRTC_ICE_CANDIDATE,
];

// ---------------------------------------------------------------------------
// Call Relay
// ---------------------------------------------------------------------------

/// Owns every call session, keyed by remote peer.
///
/// Handlers hold `&mut self` across media-layer awaits, so room events are
/// never interleaved with a negotiation step. Sessions are looked up again
/// after each await rather than borrowed across it.
pub struct CallRelay {
    config: CallConfig,
    outbound: Arc<dyn Outbound>,
    negotiator: Arc<dyn MediaNegotiator>,
    local_id: Option<PeerId>,
    room: Option<RoomCode>,
    /// Remote roster members of the current room.
    members: HashSet<PeerId>,
    sessions: HashMap<PeerId, CallSession>,
    event_tx: mpsc::UnboundedSender<CallEvent>,
}

impl CallRelay {
    pub fn new(
        config: CallConfig,
        outbound: Arc<dyn Outbound>,
        negotiator: Arc<dyn MediaNegotiator>,
    ) -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let relay = Self {
            config,
            outbound,
            negotiator,
            local_id: None,
            room: None,
            members: HashSet::new(),
            sessions: HashMap::new(),
            event_tx,
        };
        (relay, event_rx)
    }

    // -- Room membership ----------------------------------------------------

    pub async fn on_room_event(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::Connected { peer_id } => {
                self.local_id = Some(peer_id.clone());
            }
            RoomEvent::Disconnected => {
                self.hang_up_all().await;
                self.local_id = None;
                self.room = None;
                self.members.clear();
            }
            RoomEvent::RoomCreated { room } | RoomEvent::RoomJoined { room } => {
                self.hang_up_all().await;
                self.room = Some(room.room_id.clone());
                self.members.clear();
            }
            RoomEvent::PeerJoined {
                room_code,
                peer,
                newcomer,
            } => {
                if self.room.as_ref() != Some(room_code)
                    || self.local_id.as_ref() == Some(&peer.peer_id)
                {
                    return;
                }
                self.members.insert(peer.peer_id.clone());
                if *newcomer && self.config.auto_start {
                    if let Err(e) = self.start_call(&peer.peer_id).await {
                        warn!(peer = %peer.peer_id, error = %e, "Could not start call");
                    }
                }
            }
            RoomEvent::PeerLeft { room_code, peer_id } => {
                if self.room.as_ref() != Some(room_code) {
                    return;
                }
                self.members.remove(peer_id);
                self.close_session(peer_id).await;
            }
            RoomEvent::RoomLeft { .. } => {
                self.hang_up_all().await;
                self.room = None;
                self.members.clear();
            }
            _ => {}
        }
    }

    // -- Operations ---------------------------------------------------------

    /// Offer a call to `peer`. A live session is left alone.
    pub async fn start_call(&mut self, peer: &PeerId) -> Result<(), SessionError> {
        if self.room.is_none() {
            return Err(SessionError::NotInRoom);
        }
        if !self.members.contains(peer) {
            return Err(SessionError::PeerNotFound(peer.clone()));
        }
        if self.sessions.contains_key(peer) {
            debug!(peer = %peer, "Call session already exists");
            return Ok(());
        }

        self.sessions
            .insert(peer.clone(), CallSession::new(peer.clone(), true));
        let offer = self.negotiator.create_offer(peer).await;

        let Some(session) = self.sessions.get_mut(peer) else {
            debug!(peer = %peer, "Call session missing after offer");
            return Ok(());
        };
        let sdp = match offer {
            Ok(sdp) => sdp,
            Err(e) => {
                self.negotiation_failed(peer, e).await;
                return Ok(());
            }
        };

        session.state = CallState::OfferSent;
        session.pending_description = Some(sdp.clone());
        send_payload(
            self.outbound.as_ref(),
            message_types::WEBRTC_OFFER,
            &SessionDescriptionPayload {
                target_id: peer.clone(),
                sdp,
                kind: SdpKind::Offer,
            },
        );
        info!(peer = %peer, "Call offer sent");
        self.emit_state(peer, CallState::OfferSent);
        Ok(())
    }

    /// End the call with `peer` and release its media resources.
    pub async fn hang_up(&mut self, peer: &PeerId) -> Result<(), SessionError> {
        if !self.sessions.contains_key(peer) {
            return Err(SessionError::PeerNotFound(peer.clone()));
        }
        self.close_session(peer).await;
        Ok(())
    }

    pub async fn hang_up_all(&mut self) {
        let mut peers: Vec<PeerId> = self.sessions.keys().cloned().collect();
        peers.sort();
        for peer in peers {
            self.close_session(&peer).await;
        }
    }

    /// Connectivity change reported by the media layer.
    pub async fn on_media_state(&mut self, peer: &PeerId, state: MediaState) {
        let Some(session) = self.sessions.get_mut(peer) else {
            debug!(peer = %peer, ?state, "Media state for unknown call");
            return;
        };
        match state {
            MediaState::Connecting => {}
            MediaState::Connected => {
                if session.state != CallState::Connected {
                    session.state = CallState::Connected;
                    session.pending_description = None;
                    info!(peer = %peer, "Call connected");
                    self.emit_state(peer, CallState::Connected);
                }
            }
            MediaState::Disconnected | MediaState::Failed => {
                info!(peer = %peer, ?state, "Call media lost");
                self.close_session(peer).await;
            }
        }
    }

    /// Forward a locally discovered candidate to `peer`.
    pub fn send_local_candidate(
        &self,
        peer: &PeerId,
        candidate: IceCandidate,
    ) -> Result<(), SessionError> {
        if !self.sessions.contains_key(peer) {
            return Err(SessionError::PeerNotFound(peer.clone()));
        }
        send_payload(
            self.outbound.as_ref(),
            message_types::WEBRTC_ICE_CANDIDATE,
            &candidate.into_payload(peer.clone()),
        );
        Ok(())
    }

    // -- Inbound ------------------------------------------------------------

    pub async fn handle_envelope(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        match envelope.message_type.as_str() {
            message_types::WEBRTC_OFFER | message_types::WEBRTC_ANSWER => {
                let desc: SessionDescriptionPayload = envelope.payload()?;
                if !self.is_for_us(&desc.target_id) {
                    return Ok(());
                }
                if desc.sdp.trim().is_empty() {
                    return Err(SessionError::malformed(
                        &envelope.message_type,
                        "empty session description",
                    ));
                }
                let expected = if envelope.message_type == message_types::WEBRTC_OFFER {
                    SdpKind::Offer
                } else {
                    SdpKind::Answer
                };
                if desc.kind != expected {
                    return Err(SessionError::malformed(
                        &envelope.message_type,
                        format!("description kind {:?} does not match message type", desc.kind),
                    ));
                }
                match desc.kind {
                    SdpKind::Offer => self.on_offer(&envelope.sender_id, desc.sdp).await,
                    SdpKind::Answer => self.on_answer(&envelope.sender_id, desc.sdp).await,
                }
                Ok(())
            }
            message_types::WEBRTC_ICE_CANDIDATE => {
                let payload: IceCandidatePayload = envelope.payload()?;
                if !self.is_for_us(&payload.target_id) {
                    return Ok(());
                }
                if payload.candidate.trim().is_empty() {
                    return Err(SessionError::malformed(
                        &envelope.message_type,
                        "empty candidate",
                    ));
                }
                self.on_candidate(&envelope.sender_id, payload.into()).await;
                Ok(())
            }
            other => {
                debug!(message_type = %other, "Unhandled signaling message");
                Ok(())
            }
        }
    }

    async fn on_offer(&mut self, peer: &PeerId, sdp: String) {
        if self.room.is_none() {
            debug!(peer = %peer, "Offer while not in a room dropped");
            return;
        }
        if let Some(existing) = self.sessions.get(peer) {
            // Both sides offered; the lower peer id keeps its own offer.
            let we_win = self.local_id.as_ref().is_some_and(|local| local < peer);
            if existing.state == CallState::OfferSent && we_win {
                debug!(peer = %peer, "Ignoring glare offer");
                return;
            }
        }

        let session = self
            .sessions
            .entry(peer.clone())
            .or_insert_with(|| CallSession::new(peer.clone(), false));
        session.initiator = false;
        session.state = CallState::OfferReceived;
        self.emit_state(peer, CallState::OfferReceived);

        let answer = self.negotiator.accept_offer(peer, &sdp).await;
        let Some(session) = self.sessions.get_mut(peer) else {
            return;
        };
        let sdp = match answer {
            Ok(sdp) => sdp,
            Err(e) => {
                self.negotiation_failed(peer, e).await;
                return;
            }
        };

        session.state = CallState::AnswerSent;
        session.pending_description = Some(sdp.clone());
        send_payload(
            self.outbound.as_ref(),
            message_types::WEBRTC_ANSWER,
            &SessionDescriptionPayload {
                target_id: peer.clone(),
                sdp,
                kind: SdpKind::Answer,
            },
        );
        info!(peer = %peer, "Call answer sent");
        self.emit_state(peer, CallState::AnswerSent);
    }

    async fn on_answer(&mut self, peer: &PeerId, sdp: String) {
        match self.sessions.get(peer) {
            Some(session) if session.state == CallState::OfferSent => {}
            Some(session) => {
                warn!(peer = %peer, state = %session.state, "Unexpected answer dropped");
                return;
            }
            None => {
                warn!(peer = %peer, "Answer without call session dropped");
                return;
            }
        }

        let applied = self.negotiator.accept_answer(peer, &sdp).await;
        let Some(session) = self.sessions.get_mut(peer) else {
            return;
        };
        match applied {
            Ok(()) => {
                session.pending_description = None;
                debug!(peer = %peer, "Call answer applied");
            }
            Err(e) => self.negotiation_failed(peer, e).await,
        }
    }

    async fn on_candidate(&mut self, peer: &PeerId, candidate: IceCandidate) {
        let Some(session) = self.sessions.get_mut(peer) else {
            warn!(peer = %peer, "Candidate without call session dropped");
            return;
        };
        session.remote_candidates += 1;
        if let Err(e) = self.negotiator.add_remote_candidate(peer, &candidate).await {
            warn!(peer = %peer, error = %e, "Failed to apply remote candidate");
        }
    }

    // -- Queries ------------------------------------------------------------

    pub fn session(&self, peer: &PeerId) -> Option<&CallSession> {
        self.sessions.get(peer)
    }

    /// Peers with a call session, sorted.
    pub fn active_calls(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.sessions.keys().cloned().collect();
        peers.sort();
        peers
    }

    // -- Helpers ------------------------------------------------------------

    fn is_for_us(&self, target: &PeerId) -> bool {
        self.local_id.as_ref() == Some(target)
    }

    async fn negotiation_failed(&mut self, peer: &PeerId, err: NegotiationError) {
        warn!(peer = %peer, error = %err, "Call negotiation failed");
        let _ = self.event_tx.send(CallEvent::Failed {
            peer_id: peer.clone(),
            reason: err.to_string(),
        });
        self.close_session(peer).await;
    }

    async fn close_session(&mut self, peer: &PeerId) {
        if self.sessions.remove(peer).is_none() {
            return;
        }
        self.negotiator.close(peer).await;
        info!(peer = %peer, "Call closed");
        self.emit_state(peer, CallState::Closed);
        let _ = self.event_tx.send(CallEvent::Ended {
            peer_id: peer.clone(),
        });
    }

    fn emit_state(&self, peer: &PeerId, state: CallState) {
        let _ = self.event_tx.send(CallEvent::StateChanged {
            peer_id: peer.clone(),
            state,
        });
    }
}
