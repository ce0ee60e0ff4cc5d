//! Room manager: create, discover, join, leave, and area changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use plaza_common::{PeerId, RoomCode, SessionError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::outbound::{send_payload, Outbound};
use crate::protocol::{
    message_types, Envelope, PlayerNameUpdatePayload, RoomClosedPayload, RoomInfo,
    RoomJoinPayload, RoomKind, RoomLeavePayload, RoomListPayload, RoomListRequestPayload,
    RoomTeleportPayload, RoomWelcomePayload,
};

use super::types::{
    CurrentRoom, HostLossPolicy, LeaveReason, Phase, RoomConfig, RoomEvent, RoomRole, RosterEntry,
};

/// Message types the room manager consumes.
pub const SUBSCRIBED_TYPES: &[&str] = &[
    message_types::WELCOME,
    message_types::PEER_DISCONNECTED,
    message_types::ROOM_AVAILABLE,
    message_types::ROOM_CLOSED,
    message_types::ROOM_JOIN,
    message_types::ROOM_WELCOME,
    message_types::ROOM_LEAVE,
    message_types::ROOM_LIST_REQUEST,
    message_types::ROOM_LIST,
    message_types::ROOM_TELEPORT,
    message_types::PLAYER_NAME_UPDATE,
];

// ---------------------------------------------------------------------------
// Room Manager
// ---------------------------------------------------------------------------

/// Owns the session state and the advertised-room cache. Mutated only
/// through its own methods, on the caller's scheduling turn.
pub struct RoomManager {
    config: RoomConfig,
    outbound: Arc<dyn Outbound>,
    local_id: Option<PeerId>,
    display_name: String,
    current: Option<CurrentRoom>,
    /// Rooms advertised by other hosts, keyed by code.
    advertised: HashMap<RoomCode, RoomInfo>,
    event_tx: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomManager {
    pub fn new(
        config: RoomConfig,
        display_name: impl Into<String>,
        outbound: Arc<dyn Outbound>,
    ) -> (Self, mpsc::UnboundedReceiver<RoomEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mgr = Self {
            config,
            outbound,
            local_id: None,
            display_name: display_name.into(),
            current: None,
            advertised: HashMap::new(),
            event_tx,
        };
        (mgr, event_rx)
    }

    // -- Queries ------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        match (&self.local_id, &self.current) {
            (None, _) => Phase::Disconnected,
            (Some(_), None) => Phase::Idle,
            (Some(_), Some(_)) => Phase::InRoom,
        }
    }

    pub fn local_id(&self) -> Option<&PeerId> {
        self.local_id.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn current_room(&self) -> Option<&CurrentRoom> {
        self.current.as_ref()
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.current.as_ref().map(CurrentRoom::code)
    }

    pub fn is_in_room(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_host(&self) -> bool {
        self.current.as_ref().is_some_and(CurrentRoom::is_host)
    }

    pub fn sub_area(&self) -> Option<RoomKind> {
        self.current.as_ref().map(|room| room.sub_area)
    }

    /// Roster of the current room, local participant included.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.current
            .as_ref()
            .map(|room| room.roster.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Cached advertised rooms, sorted by code.
    pub fn advertised_rooms(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self.advertised.values().cloned().collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    // -- Operations ---------------------------------------------------------

    /// Create and host a new room, advertising it to every peer.
    pub fn create_room(&mut self, kind: RoomKind, name: &str) -> Result<RoomCode, SessionError> {
        let local_id = self.require_idle()?;

        let code = RoomCode::generate();
        let info = RoomInfo {
            room_id: code.clone(),
            host_id: local_id.clone(),
            room_name: name.trim().to_string(),
            room_type: kind,
            player_count: 1,
            max_players: self.config.max_players,
        };
        let mut roster = BTreeMap::new();
        roster.insert(
            local_id.clone(),
            RosterEntry {
                peer_id: local_id,
                display_name: self.display_name.clone(),
                is_host: true,
                sub_area: kind,
            },
        );
        self.current = Some(CurrentRoom {
            info: info.clone(),
            role: RoomRole::Host,
            sub_area: kind,
            roster,
            awaiting_welcome: None,
        });

        send_payload(self.outbound.as_ref(), message_types::ROOM_AVAILABLE, &info);
        info!(room = %code, kind = %kind, "Room created");
        self.emit(RoomEvent::RoomCreated { room: info });
        Ok(code)
    }

    /// Join a room from the advertised cache. The roster stays provisional
    /// until the host's `room-welcome` arrives.
    pub fn join_room(&mut self, code: &str) -> Result<(), SessionError> {
        let local_id = self.require_idle()?;
        let code = RoomCode::parse(code).map_err(|e| self.fail(e))?;

        let info = self
            .advertised
            .get(&code)
            .cloned()
            .ok_or_else(|| self.fail(SessionError::RoomNotFound(code.clone())))?;
        if info.is_full() {
            return Err(self.fail(SessionError::RoomFull {
                code,
                capacity: info.max_players,
            }));
        }

        let mut roster = BTreeMap::new();
        roster.insert(
            local_id.clone(),
            RosterEntry {
                peer_id: local_id.clone(),
                display_name: self.display_name.clone(),
                is_host: false,
                sub_area: info.room_type,
            },
        );
        self.current = Some(CurrentRoom {
            info: info.clone(),
            role: RoomRole::Guest,
            sub_area: info.room_type,
            roster,
            awaiting_welcome: Some(Duration::ZERO),
        });

        send_payload(
            self.outbound.as_ref(),
            message_types::ROOM_JOIN,
            &RoomJoinPayload {
                room_id: code.clone(),
                player_id: local_id,
                player_name: self.display_name.clone(),
            },
        );
        info!(room = %code, host = %info.host_id, "Joining room");
        self.emit(RoomEvent::RoomJoined { room: info });
        Ok(())
    }

    /// Leave the current room. A host also closes it for everyone.
    pub fn leave_room(&mut self) -> Result<(), SessionError> {
        let Some(room) = self.current.take() else {
            return Err(self.fail(SessionError::NotInRoom));
        };
        let code = room.code().clone();

        if let Some(local_id) = self.local_id.clone() {
            send_payload(
                self.outbound.as_ref(),
                message_types::ROOM_LEAVE,
                &RoomLeavePayload {
                    room_id: code.clone(),
                    player_id: local_id.clone(),
                },
            );
            if room.is_host() {
                send_payload(
                    self.outbound.as_ref(),
                    message_types::ROOM_CLOSED,
                    &RoomClosedPayload {
                        room_id: code.clone(),
                        host_id: local_id,
                    },
                );
            }
        }

        info!(room = %code, host = room.is_host(), "Left room");
        self.emit(RoomEvent::RoomLeft {
            room_code: code,
            reason: LeaveReason::Requested,
        });
        Ok(())
    }

    /// Move the local participant to another sub-area of the current room.
    pub fn change_sub_area(&mut self, kind: RoomKind) -> Result<(), SessionError> {
        let Some(local_id) = self.local_id.clone() else {
            return Err(self.fail(SessionError::NotInRoom));
        };
        let Some(room) = self.current.as_mut() else {
            return Err(self.fail(SessionError::NotInRoom));
        };
        room.sub_area = kind;
        if let Some(entry) = room.roster.get_mut(&local_id) {
            entry.sub_area = kind;
        }
        let room_id = room.code().clone();

        send_payload(
            self.outbound.as_ref(),
            message_types::ROOM_TELEPORT,
            &RoomTeleportPayload {
                room_id,
                player_id: local_id.clone(),
                target_room_type: kind,
            },
        );
        debug!(sub_area = %kind, "Changed sub-area");
        self.emit(RoomEvent::SubAreaChanged {
            peer_id: local_id,
            sub_area: kind,
        });
        Ok(())
    }

    /// Ask every advertising host to report its room.
    pub fn request_room_list(&mut self) -> Result<(), SessionError> {
        if self.local_id.is_none() {
            return Err(self.fail(SessionError::NotConnected));
        }
        send_payload(
            self.outbound.as_ref(),
            message_types::ROOM_LIST_REQUEST,
            &RoomListRequestPayload::default(),
        );
        Ok(())
    }

    /// Change the local display name; broadcast without confirmation when
    /// in a room.
    pub fn set_display_name(&mut self, name: &str) {
        let name = name.trim().to_string();
        self.display_name = name.clone();

        let Some(local_id) = self.local_id.clone() else {
            return;
        };
        let Some(room) = self.current.as_mut() else {
            return;
        };
        if let Some(entry) = room.roster.get_mut(&local_id) {
            entry.display_name = name.clone();
        }
        send_payload(
            self.outbound.as_ref(),
            message_types::PLAYER_NAME_UPDATE,
            &PlayerNameUpdatePayload {
                room_id: room.code().clone(),
                player_id: local_id.clone(),
                player_name: name.clone(),
            },
        );
        self.emit(RoomEvent::PeerRenamed {
            peer_id: local_id,
            display_name: name,
        });
    }

    /// Advance timers. A guest still waiting for `room-welcome` after the
    /// join timeout gives up and returns to Idle.
    pub fn tick(&mut self, elapsed: Duration) {
        let Some(timeout) = self.config.join_timeout else {
            return;
        };
        let timed_out = match self.current.as_mut().and_then(|r| r.awaiting_welcome.as_mut()) {
            Some(waited) => {
                *waited += elapsed;
                *waited >= timeout
            }
            None => false,
        };
        if !timed_out {
            return;
        }

        if let Some(room) = self.current.take() {
            let code = room.code().clone();
            if let Some(local_id) = self.local_id.clone() {
                // The host may have admitted us after all; tell it we gave up.
                send_payload(
                    self.outbound.as_ref(),
                    message_types::ROOM_LEAVE,
                    &RoomLeavePayload {
                        room_id: code.clone(),
                        player_id: local_id,
                    },
                );
            }
            warn!(room = %code, "No room-welcome from host; giving up");
            self.emit(RoomEvent::Error(SessionError::JoinTimedOut(code.clone())));
            self.emit(RoomEvent::RoomLeft {
                room_code: code,
                reason: LeaveReason::JoinTimedOut,
            });
        }
    }

    /// Transport dropped: leave without notifying anyone and forget the
    /// identity and the room cache.
    pub fn handle_disconnected(&mut self) {
        self.close_current(LeaveReason::Disconnected);
        self.local_id = None;
        self.advertised.clear();
        info!("Session reset after disconnect");
        self.emit(RoomEvent::Disconnected);
    }

    // -- Inbound ------------------------------------------------------------

    /// Apply one inbound message. Errors are per-message; the caller logs
    /// them and moves on.
    pub fn handle_envelope(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        let sender = &envelope.sender_id;
        match envelope.message_type.as_str() {
            message_types::WELCOME => {
                self.on_welcome(sender.clone());
                Ok(())
            }
            message_types::PEER_DISCONNECTED => {
                self.on_peer_disconnected(sender);
                Ok(())
            }
            message_types::ROOM_AVAILABLE => {
                let info: RoomInfo = envelope.payload()?;
                self.on_room_available(sender, info);
                Ok(())
            }
            message_types::ROOM_CLOSED => {
                let closed: RoomClosedPayload = envelope.payload()?;
                self.on_room_closed(sender, closed);
                Ok(())
            }
            message_types::ROOM_JOIN => {
                let join: RoomJoinPayload = envelope.payload()?;
                check_sender(envelope, &join.player_id)?;
                self.on_room_join(join);
                Ok(())
            }
            message_types::ROOM_WELCOME => {
                let welcome: RoomWelcomePayload = envelope.payload()?;
                self.on_room_welcome(sender, welcome);
                Ok(())
            }
            message_types::ROOM_LEAVE => {
                let leave: RoomLeavePayload = envelope.payload()?;
                check_sender(envelope, &leave.player_id)?;
                self.on_room_leave(leave);
                Ok(())
            }
            message_types::ROOM_LIST_REQUEST => {
                self.on_room_list_request();
                Ok(())
            }
            message_types::ROOM_LIST => {
                let list: RoomListPayload = envelope.payload()?;
                self.on_room_list(list);
                Ok(())
            }
            message_types::ROOM_TELEPORT => {
                let teleport: RoomTeleportPayload = envelope.payload()?;
                check_sender(envelope, &teleport.player_id)?;
                self.on_room_teleport(teleport);
                Ok(())
            }
            message_types::PLAYER_NAME_UPDATE => {
                let update: PlayerNameUpdatePayload = envelope.payload()?;
                check_sender(envelope, &update.player_id)?;
                self.on_player_name_update(update);
                Ok(())
            }
            other => {
                debug!(message_type = %other, "Unhandled room message");
                Ok(())
            }
        }
    }

    fn on_welcome(&mut self, peer_id: PeerId) {
        if self.current.is_some() {
            self.close_current(LeaveReason::Disconnected);
        }
        info!(peer = %peer_id, "Connected to relay");
        self.local_id = Some(peer_id.clone());
        self.emit(RoomEvent::Connected { peer_id });
    }

    fn on_room_available(&mut self, sender: &PeerId, info: RoomInfo) {
        if let Some(room) = self.current.as_mut() {
            if room.info.room_id == info.room_id {
                if room.is_host() {
                    warn!(
                        room = %info.room_id,
                        other_host = %sender,
                        "Room code collision with another host"
                    );
                    return;
                }
                room.info.player_count = info.player_count;
                room.info.max_players = info.max_players;
            }
        }
        debug!(room = %info.room_id, players = info.player_count, "Room advertised");
        self.advertised.insert(info.room_id.clone(), info);
        self.emit_room_list();
    }

    fn on_room_closed(&mut self, sender: &PeerId, closed: RoomClosedPayload) {
        let was_cached = self.advertised.remove(&closed.room_id).is_some();

        let ours_as_guest = self
            .current
            .as_ref()
            .is_some_and(|room| *room.code() == closed.room_id && !room.is_host());
        if ours_as_guest {
            info!(room = %closed.room_id, host = %sender, "Room closed by host");
            self.close_current(LeaveReason::Closed);
            self.emit(RoomEvent::Error(SessionError::RoomClosed(closed.room_id)));
        }

        if was_cached {
            self.emit_room_list();
        }
    }

    fn on_room_join(&mut self, join: RoomJoinPayload) {
        let Some(local_id) = self.local_id.clone() else {
            return;
        };
        let Some(room) = self.current.as_mut() else {
            debug!(room = %join.room_id, "room-join while idle ignored");
            return;
        };
        if *room.code() != join.room_id {
            debug!(room = %join.room_id, "room-join for another room ignored");
            return;
        }
        if join.player_id == local_id {
            return;
        }

        let is_new = !room.roster.contains_key(&join.player_id);
        if is_new && room.roster.len() >= room.info.max_players as usize {
            // No refusal message exists; the joiner's own timeout ends the attempt.
            warn!(
                room = %join.room_id,
                peer = %join.player_id,
                capacity = room.info.max_players,
                "Room full; join ignored"
            );
            return;
        }
        if is_new {
            let entry = RosterEntry {
                peer_id: join.player_id.clone(),
                display_name: join.player_name.clone(),
                is_host: false,
                sub_area: room.info.room_type,
            };
            room.roster.insert(join.player_id.clone(), entry.clone());
            info!(room = %join.room_id, peer = %join.player_id, "Peer joined room");
            let _ = self.event_tx.send(RoomEvent::PeerJoined {
                room_code: join.room_id.clone(),
                peer: entry,
                newcomer: true,
            });
        }

        if !room.is_host() {
            return;
        }
        room.info.player_count = room.roster.len() as u32;

        // A repeated join (lost welcome) just gets the snapshot again.
        let welcome = RoomWelcomePayload {
            room_id: room.code().clone(),
            target_id: join.player_id.clone(),
            room_type: room.info.room_type,
            room_name: room.info.room_name.clone(),
            max_players: room.info.max_players,
            players: room.roster.values().map(RosterEntry::to_player_info).collect(),
        };
        send_payload(self.outbound.as_ref(), message_types::ROOM_WELCOME, &welcome);
        if is_new {
            send_payload(
                self.outbound.as_ref(),
                message_types::ROOM_AVAILABLE,
                &room.info,
            );
        }
    }

    fn on_room_welcome(&mut self, sender: &PeerId, welcome: RoomWelcomePayload) {
        let Some(local_id) = self.local_id.clone() else {
            return;
        };
        if welcome.target_id != local_id {
            return;
        }
        let Some(room) = self.current.as_mut() else {
            debug!(room = %welcome.room_id, "Late room-welcome ignored");
            return;
        };
        if *room.code() != welcome.room_id || room.is_host() {
            debug!(room = %welcome.room_id, "room-welcome for another room ignored");
            return;
        }

        room.awaiting_welcome = None;
        room.info.room_type = welcome.room_type;
        room.info.host_id = sender.clone();
        if !welcome.room_name.is_empty() {
            room.info.room_name = welcome.room_name.clone();
        }
        if welcome.max_players > 0 {
            room.info.max_players = welcome.max_players;
        }

        for player in welcome.players {
            if player.player_id == local_id {
                continue;
            }
            if player.is_host {
                room.info.host_id = player.player_id.clone();
            }
            match room.roster.get_mut(&player.player_id) {
                Some(entry) => {
                    entry.display_name = player.player_name;
                    entry.is_host = player.is_host;
                    entry.sub_area = player.room_type;
                }
                None => {
                    let entry = RosterEntry {
                        peer_id: player.player_id.clone(),
                        display_name: player.player_name,
                        is_host: player.is_host,
                        sub_area: player.room_type,
                    };
                    room.roster.insert(player.player_id, entry.clone());
                    let _ = self.event_tx.send(RoomEvent::PeerJoined {
                        room_code: welcome.room_id.clone(),
                        peer: entry,
                        newcomer: false,
                    });
                }
            }
        }
        room.info.player_count = room.roster.len() as u32;

        info!(room = %welcome.room_id, players = room.roster.len(), "Roster received from host");
        let _ = self.event_tx.send(RoomEvent::RosterConfirmed {
            room: room.info.clone(),
        });
    }

    fn on_room_leave(&mut self, leave: RoomLeavePayload) {
        if self.remove_peer(&leave.room_id, &leave.player_id) {
            info!(room = %leave.room_id, peer = %leave.player_id, "Peer left room");
        }
    }

    fn on_room_list_request(&mut self) {
        let Some(room) = self.current.as_ref().filter(|room| room.is_host()) else {
            return;
        };
        send_payload(
            self.outbound.as_ref(),
            message_types::ROOM_LIST,
            &RoomListPayload {
                rooms: vec![room.info.clone()],
            },
        );
    }

    fn on_room_list(&mut self, list: RoomListPayload) {
        let hosted = self
            .current
            .as_ref()
            .filter(|room| room.is_host())
            .map(|room| room.code().clone());
        for info in list.rooms {
            if hosted.as_ref() == Some(&info.room_id) {
                continue;
            }
            self.advertised.insert(info.room_id.clone(), info);
        }
        self.emit_room_list();
    }

    fn on_room_teleport(&mut self, teleport: RoomTeleportPayload) {
        let Some(entry) = self.roster_entry_mut(&teleport.room_id, &teleport.player_id) else {
            return;
        };
        entry.sub_area = teleport.target_room_type;
        self.emit(RoomEvent::SubAreaChanged {
            peer_id: teleport.player_id,
            sub_area: teleport.target_room_type,
        });
    }

    fn on_player_name_update(&mut self, update: PlayerNameUpdatePayload) {
        let Some(entry) = self.roster_entry_mut(&update.room_id, &update.player_id) else {
            return;
        };
        entry.display_name = update.player_name.clone();
        self.emit(RoomEvent::PeerRenamed {
            peer_id: update.player_id,
            display_name: update.player_name,
        });
    }

    fn on_peer_disconnected(&mut self, peer_id: &PeerId) {
        let before = self.advertised.len();
        self.advertised.retain(|_, info| info.host_id != *peer_id);
        if self.advertised.len() != before {
            self.emit_room_list();
        }

        let Some(room) = self.current.as_ref() else {
            return;
        };
        let code = room.code().clone();
        let was_host = room.info.host_id == *peer_id && !room.is_host();
        if !self.remove_peer(&code, peer_id) && !was_host {
            return;
        }
        info!(room = %code, peer = %peer_id, "Peer disconnected");

        if was_host {
            match self.config.host_loss_policy {
                HostLossPolicy::CloseRoom => {
                    info!(room = %code, "Host disconnected; closing room");
                    self.close_current(LeaveReason::HostLost);
                    self.emit(RoomEvent::Error(SessionError::RoomClosed(code)));
                }
                HostLossPolicy::Stay => {
                    warn!(room = %code, "Host disconnected; staying in hostless room");
                }
            }
        }
    }

    // -- Helpers ------------------------------------------------------------

    /// Remove a remote peer from the current room's roster. A host
    /// re-advertises the new occupancy.
    fn remove_peer(&mut self, room_code: &RoomCode, peer_id: &PeerId) -> bool {
        if self.local_id.as_ref() == Some(peer_id) {
            return false;
        }
        let Some(room) = self.current.as_mut().filter(|room| room.code() == room_code) else {
            return false;
        };
        if room.roster.remove(peer_id).is_none() {
            return false;
        }
        room.info.player_count = room.roster.len() as u32;
        if room.is_host() {
            send_payload(
                self.outbound.as_ref(),
                message_types::ROOM_AVAILABLE,
                &room.info,
            );
        }
        let _ = self.event_tx.send(RoomEvent::PeerLeft {
            room_code: room_code.clone(),
            peer_id: peer_id.clone(),
        });
        true
    }

    fn roster_entry_mut(
        &mut self,
        room_code: &RoomCode,
        peer_id: &PeerId,
    ) -> Option<&mut RosterEntry> {
        if self.local_id.as_ref() == Some(peer_id) {
            return None;
        }
        self.current
            .as_mut()
            .filter(|room| room.code() == room_code)
            .and_then(|room| room.roster.get_mut(peer_id))
    }

    fn close_current(&mut self, reason: LeaveReason) {
        if let Some(room) = self.current.take() {
            self.emit(RoomEvent::RoomLeft {
                room_code: room.info.room_id,
                reason,
            });
        }
    }

    /// Connected and not in a room; returns the local id.
    fn require_idle(&self) -> Result<PeerId, SessionError> {
        let Some(local_id) = self.local_id.clone() else {
            return Err(self.fail(SessionError::NotConnected));
        };
        if let Some(room) = &self.current {
            return Err(self.fail(SessionError::AlreadyInRoom(room.code().clone())));
        }
        Ok(local_id)
    }

    /// Report a rejected operation through the event stream as well.
    fn fail(&self, err: SessionError) -> SessionError {
        warn!(error = %err, "Room operation rejected");
        self.emit(RoomEvent::Error(err.clone()));
        err
    }

    fn emit_room_list(&self) {
        self.emit(RoomEvent::RoomListUpdated {
            rooms: self.advertised_rooms(),
        });
    }

    fn emit(&self, event: RoomEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// The relay stamps `senderId`; a payload claiming another player is dropped.
fn check_sender(envelope: &Envelope, player_id: &PeerId) -> Result<(), SessionError> {
    if envelope.sender_id == *player_id {
        Ok(())
    } else {
        Err(SessionError::malformed(
            &envelope.message_type,
            format!(
                "playerId {player_id} does not match sender {}",
                envelope.sender_id
            ),
        ))
    }
}
