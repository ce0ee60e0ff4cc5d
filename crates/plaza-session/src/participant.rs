//! Composition root: one participant's session components wired together.
//!
//! The router fans inbound envelopes out to per-component subscriptions;
//! each component then drains its own queue on its turn. Room events are
//! forwarded to the replication engine and the call relay before they
//! reach the UI, so every component sees membership changes in the same
//! order.

use std::sync::Arc;
use std::time::Duration;

use plaza_common::{PeerId, RoomCode, SessionError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::outbound::Outbound;
use crate::pose::AvatarPose;
use crate::protocol::{RoomInfo, RoomKind};
use crate::replication::{
    ReplicationConfig, ReplicationEngine, SUBSCRIBED_TYPES as REPLICATION_TYPES,
};
use crate::room::{
    Phase, RoomConfig, RoomEvent, RoomManager, RosterEntry, SUBSCRIBED_TYPES as ROOM_TYPES,
};
use crate::router::{MessageRouter, Subscription};
use crate::signaling::{
    CallConfig, CallEvent, CallRelay, CallSession, IceCandidate, MediaNegotiator, MediaState,
    SUBSCRIBED_TYPES as SIGNALING_TYPES,
};
use crate::transport::TransportEvent;

// ---------------------------------------------------------------------------
// Configuration & events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParticipantConfig {
    pub display_name: String,
    pub room: RoomConfig,
    pub replication: ReplicationConfig,
    pub call: CallConfig,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            display_name: "Guest".to_string(),
            room: RoomConfig::default(),
            replication: ReplicationConfig::default(),
            call: CallConfig::default(),
        }
    }
}

/// Everything a UI collaborator needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Room(RoomEvent),
    Call(CallEvent),
    /// A public operation was rejected.
    Error(SessionError),
    /// The transport failed to (re)connect.
    TransportError(String),
}

struct CallSlot {
    relay: CallRelay,
    subscription: Subscription,
    events: mpsc::UnboundedReceiver<CallEvent>,
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

pub struct Participant {
    router: MessageRouter,
    room: RoomManager,
    room_events: mpsc::UnboundedReceiver<RoomEvent>,
    room_subscription: Subscription,
    replication: ReplicationEngine,
    replication_subscription: Subscription,
    calls: Option<CallSlot>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl Participant {
    /// Build the component graph. The call relay exists only when voice is
    /// enabled and a media layer is supplied.
    pub fn new(
        config: ParticipantConfig,
        outbound: Arc<dyn Outbound>,
        negotiator: Option<Arc<dyn MediaNegotiator>>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut router = MessageRouter::new();

        let (room, room_events) =
            RoomManager::new(config.room, config.display_name, Arc::clone(&outbound));
        let room_subscription = router.subscribe(ROOM_TYPES);

        let replication = ReplicationEngine::new(config.replication, Arc::clone(&outbound));
        let replication_subscription = router.subscribe(REPLICATION_TYPES);

        let calls = match negotiator {
            Some(negotiator) if config.call.enabled => {
                let (relay, events) = CallRelay::new(config.call, outbound, negotiator);
                let subscription = router.subscribe(SIGNALING_TYPES);
                Some(CallSlot {
                    relay,
                    subscription,
                    events,
                })
            }
            Some(_) => {
                debug!("Voice disabled; media layer unused");
                None
            }
            None => None,
        };

        let participant = Self {
            router,
            room,
            room_events,
            room_subscription,
            replication,
            replication_subscription,
            calls,
            event_tx,
        };
        (participant, event_rx)
    }

    // -- Driving ------------------------------------------------------------

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { peer_id } => {
                // The welcome message that follows carries the identity.
                debug!(peer = %peer_id, "Transport up");
            }
            TransportEvent::Disconnected => {
                self.router.clear_local_id();
                self.room.handle_disconnected();
            }
            TransportEvent::Message(envelope) => {
                self.router.publish(envelope);
            }
            TransportEvent::Error(reason) => {
                warn!(reason = %reason, "Transport error");
                self.emit(SessionEvent::TransportError(reason));
            }
        }
        self.pump().await;
    }

    /// Advance timers: join timeout, pose publish, and interpolation.
    pub async fn tick(&mut self, elapsed: Duration) {
        self.room.tick(elapsed);
        self.replication.tick(elapsed);
        self.pump().await;
    }

    /// Let every component drain its queue once, in a fixed order.
    async fn pump(&mut self) {
        while let Ok(envelope) = self.room_subscription.rx.try_recv() {
            if let Err(e) = self.room.handle_envelope(&envelope) {
                warn!(message_type = %envelope.message_type, error = %e, "Dropping room message");
            }
        }

        while let Ok(event) = self.room_events.try_recv() {
            self.replication.on_room_event(&event);
            if let Some(calls) = self.calls.as_mut() {
                calls.relay.on_room_event(&event).await;
            }
            let event = match event {
                RoomEvent::Error(e) => SessionEvent::Error(e),
                other => SessionEvent::Room(other),
            };
            let _ = self.event_tx.send(event);
        }

        while let Ok(envelope) = self.replication_subscription.rx.try_recv() {
            if let Err(e) = self.replication.handle_envelope(&envelope) {
                warn!(peer = %envelope.sender_id, error = %e, "Dropping pose update");
            }
        }

        if let Some(calls) = self.calls.as_mut() {
            while let Ok(envelope) = calls.subscription.rx.try_recv() {
                if let Err(e) = calls.relay.handle_envelope(&envelope).await {
                    warn!(message_type = %envelope.message_type, error = %e, "Dropping signaling message");
                }
            }
            while let Ok(event) = calls.events.try_recv() {
                let _ = self.event_tx.send(SessionEvent::Call(event));
            }
        }
    }

    /// Detach every component from the router.
    pub fn shutdown(&mut self) {
        self.router.unsubscribe(self.room_subscription.id);
        self.router.unsubscribe(self.replication_subscription.id);
        if let Some(calls) = &self.calls {
            self.router.unsubscribe(calls.subscription.id);
        }
        info!("Participant shut down");
    }

    // -- Room operations ----------------------------------------------------

    pub async fn create_room(
        &mut self,
        kind: RoomKind,
        name: &str,
    ) -> Result<RoomCode, SessionError> {
        let result = self.room.create_room(kind, name);
        self.pump().await;
        result
    }

    pub async fn join_room(&mut self, code: &str) -> Result<(), SessionError> {
        let result = self.room.join_room(code);
        self.pump().await;
        result
    }

    pub async fn leave_room(&mut self) -> Result<(), SessionError> {
        let result = self.room.leave_room();
        self.pump().await;
        result
    }

    pub async fn change_sub_area(&mut self, kind: RoomKind) -> Result<(), SessionError> {
        let result = self.room.change_sub_area(kind);
        self.pump().await;
        result
    }

    pub async fn set_display_name(&mut self, name: &str) {
        self.room.set_display_name(name);
        self.pump().await;
    }

    pub async fn request_room_list(&mut self) -> Result<(), SessionError> {
        let result = self.room.request_room_list();
        self.pump().await;
        result
    }

    pub fn set_local_pose(&mut self, pose: AvatarPose) {
        self.replication.set_local_pose(pose);
    }

    // -- Call operations ----------------------------------------------------

    pub async fn start_call(&mut self, peer: &PeerId) -> Result<(), SessionError> {
        let result = match self.calls.as_mut() {
            Some(calls) => calls.relay.start_call(peer).await,
            None => Err(SessionError::VoiceDisabled),
        };
        self.finish_call_op(result).await
    }

    pub async fn hang_up(&mut self, peer: &PeerId) -> Result<(), SessionError> {
        let result = match self.calls.as_mut() {
            Some(calls) => calls.relay.hang_up(peer).await,
            None => Err(SessionError::VoiceDisabled),
        };
        self.finish_call_op(result).await
    }

    pub async fn hang_up_all(&mut self) {
        if let Some(calls) = self.calls.as_mut() {
            calls.relay.hang_up_all().await;
        }
        self.pump().await;
    }

    /// Connectivity reported by the media layer for `peer`.
    pub async fn on_media_state(&mut self, peer: &PeerId, state: MediaState) {
        if let Some(calls) = self.calls.as_mut() {
            calls.relay.on_media_state(peer, state).await;
        }
        self.pump().await;
    }

    pub async fn send_local_candidate(
        &mut self,
        peer: &PeerId,
        candidate: IceCandidate,
    ) -> Result<(), SessionError> {
        let result = match self.calls.as_ref() {
            Some(calls) => calls.relay.send_local_candidate(peer, candidate),
            None => Err(SessionError::VoiceDisabled),
        };
        self.finish_call_op(result).await
    }

    async fn finish_call_op(&mut self, result: Result<(), SessionError>) -> Result<(), SessionError> {
        if let Err(e) = &result {
            warn!(error = %e, "Call operation rejected");
            self.emit(SessionEvent::Error(e.clone()));
        }
        self.pump().await;
        result
    }

    // -- Queries ------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.room.phase()
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.room.local_id()
    }

    pub fn display_name(&self) -> &str {
        self.room.display_name()
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room.room_code()
    }

    pub fn current_room(&self) -> Option<&RoomInfo> {
        self.room.current_room().map(|room| &room.info)
    }

    pub fn is_host(&self) -> bool {
        self.room.is_host()
    }

    pub fn sub_area(&self) -> Option<RoomKind> {
        self.room.sub_area()
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.room.roster()
    }

    pub fn advertised_rooms(&self) -> Vec<RoomInfo> {
        self.room.advertised_rooms()
    }

    pub fn remote_pose(&self, peer: &PeerId) -> Option<&AvatarPose> {
        self.replication.remote_pose(peer)
    }

    pub fn remote_poses(&self) -> Vec<(PeerId, AvatarPose)> {
        self.replication.remote_poses()
    }

    pub fn call_session(&self, peer: &PeerId) -> Option<&CallSession> {
        self.calls.as_ref().and_then(|calls| calls.relay.session(peer))
    }

    pub fn voice_enabled(&self) -> bool {
        self.calls.is_some()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
