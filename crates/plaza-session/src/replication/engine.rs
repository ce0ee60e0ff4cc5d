use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use plaza_common::{PeerId, RoomCode, SessionError};
use tracing::{debug, trace, warn};

use crate::outbound::{send_payload, Outbound};
use crate::pose::AvatarPose;
use crate::protocol::{message_types, Envelope, RoomKind, VrPositionPayload};
use crate::room::RoomEvent;

use super::types::{RemotePeer, ReplicationConfig};

/// Message types the replication engine consumes.
pub const SUBSCRIBED_TYPES: &[&str] = &[message_types::VR_POSITION];

// ---------------------------------------------------------------------------
// Replication Engine
// ---------------------------------------------------------------------------

/// Owns the pose half of every roster entry. Membership follows the room
/// manager's events; poses follow `vr-position` messages.
pub struct ReplicationEngine {
    config: ReplicationConfig,
    outbound: Arc<dyn Outbound>,
    local_id: Option<PeerId>,
    room: Option<RoomCode>,
    sub_area: RoomKind,
    local_pose: AvatarPose,
    since_publish: Duration,
    remotes: HashMap<PeerId, RemotePeer>,
}

impl ReplicationEngine {
    pub fn new(config: ReplicationConfig, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            config,
            outbound,
            local_id: None,
            room: None,
            sub_area: RoomKind::default(),
            local_pose: AvatarPose::default(),
            since_publish: Duration::ZERO,
            remotes: HashMap::new(),
        }
    }

    /// Follow roster membership and the local room/sub-area.
    pub fn on_room_event(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::Connected { peer_id } => {
                self.local_id = Some(peer_id.clone());
            }
            RoomEvent::Disconnected => {
                self.local_id = None;
                self.reset();
            }
            RoomEvent::RoomCreated { room } | RoomEvent::RoomJoined { room } => {
                self.reset();
                self.room = Some(room.room_id.clone());
                self.sub_area = room.room_type;
                // Publish promptly on the first tick in the new room.
                self.since_publish = self.config.publish_interval;
            }
            RoomEvent::PeerJoined {
                room_code, peer, ..
            } => {
                if self.room.as_ref() != Some(room_code) || self.is_local(&peer.peer_id) {
                    return;
                }
                self.remotes
                    .entry(peer.peer_id.clone())
                    .or_insert_with(|| RemotePeer::spawned(peer.sub_area));
            }
            RoomEvent::PeerLeft { room_code, peer_id } => {
                if self.room.as_ref() == Some(room_code) && self.remotes.remove(peer_id).is_some()
                {
                    debug!(peer = %peer_id, "Stopped tracking pose");
                }
            }
            RoomEvent::SubAreaChanged { peer_id, sub_area } => {
                if self.is_local(peer_id) {
                    self.sub_area = *sub_area;
                } else if let Some(remote) = self.remotes.get_mut(peer_id) {
                    remote.sub_area = *sub_area;
                }
            }
            RoomEvent::RoomLeft { .. } => self.reset(),
            _ => {}
        }
    }

    /// Latest local pose from the input collaborator; sent on the next
    /// publish tick.
    pub fn set_local_pose(&mut self, pose: AvatarPose) {
        if !pose.is_finite() {
            warn!("Ignoring non-finite local pose");
            return;
        }
        self.local_pose = pose;
    }

    pub fn local_pose(&self) -> &AvatarPose {
        &self.local_pose
    }

    /// Publish on the fixed interval, then advance every remote pose.
    pub fn tick(&mut self, elapsed: Duration) {
        let Some(room) = self.room.clone() else {
            return;
        };

        self.since_publish += elapsed;
        if self.since_publish >= self.config.publish_interval {
            // Keep the remainder, but never let a long stall queue a burst.
            self.since_publish -= self.config.publish_interval;
            if self.since_publish >= self.config.publish_interval {
                self.since_publish = Duration::ZERO;
            }
            self.publish(room);
        }

        let t = elapsed.as_secs_f32() * self.config.interpolation_rate;
        for remote in self.remotes.values_mut() {
            if let (Some(displayed), Some(target)) = (remote.displayed.as_mut(), &remote.target) {
                displayed.step_toward(target, t);
            }
        }
    }

    fn publish(&self, room_id: RoomCode) {
        trace!(room = %room_id, "Publishing pose");
        send_payload(
            self.outbound.as_ref(),
            message_types::VR_POSITION,
            &VrPositionPayload {
                room_id,
                room_type: self.sub_area,
                pose: self.local_pose,
            },
        );
    }

    /// Store an inbound snapshot as the peer's target. Updates for another
    /// room or for peers not in the roster are dropped, not queued.
    pub fn handle_envelope(&mut self, envelope: &Envelope) -> Result<(), SessionError> {
        if envelope.message_type != message_types::VR_POSITION {
            return Ok(());
        }
        let update: VrPositionPayload = envelope.payload()?;

        if self.room.as_ref() != Some(&update.room_id) {
            trace!(room = %update.room_id, peer = %envelope.sender_id, "Pose for another room dropped");
            return Ok(());
        }
        let Some(remote) = self.remotes.get_mut(&envelope.sender_id) else {
            trace!(peer = %envelope.sender_id, "Pose for unknown peer dropped");
            return Ok(());
        };
        if !update.pose.is_finite() {
            return Err(SessionError::malformed(
                &envelope.message_type,
                "non-finite pose component",
            ));
        }

        remote.sub_area = update.room_type;
        remote.target = Some(update.pose);
        remote.updates_received += 1;
        if remote.displayed.is_none() {
            // Nothing sensible to blend from; start at the first snapshot.
            remote.displayed = Some(update.pose);
        }
        Ok(())
    }

    // -- Queries ------------------------------------------------------------

    /// Smoothed pose of `peer_id`, or `None` before its first update.
    pub fn remote_pose(&self, peer_id: &PeerId) -> Option<&AvatarPose> {
        self.remotes.get(peer_id).and_then(|r| r.displayed.as_ref())
    }

    pub fn remote(&self, peer_id: &PeerId) -> Option<&RemotePeer> {
        self.remotes.get(peer_id)
    }

    /// Smoothed poses of every peer that has sent at least one update.
    pub fn remote_poses(&self) -> Vec<(PeerId, AvatarPose)> {
        let mut poses: Vec<(PeerId, AvatarPose)> = self
            .remotes
            .iter()
            .filter_map(|(id, r)| r.displayed.map(|pose| (id.clone(), pose)))
            .collect();
        poses.sort_by(|a, b| a.0.cmp(&b.0));
        poses
    }

    pub fn tracked_peers(&self) -> usize {
        self.remotes.len()
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room.as_ref()
    }

    fn is_local(&self, peer_id: &PeerId) -> bool {
        self.local_id.as_ref() == Some(peer_id)
    }

    fn reset(&mut self) {
        self.room = None;
        self.remotes.clear();
        self.since_publish = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Quat, TrackedPose, Vec3};
    use crate::protocol::RoomInfo;
    use crate::room::RosterEntry;
    use crate::test_support::{envelope, RecordingOutbound};

    fn code() -> RoomCode {
        RoomCode::from_normalized("ABC234")
    }

    fn room_info() -> RoomInfo {
        RoomInfo {
            room_id: code(),
            host_id: PeerId::from("bob"),
            room_name: "Chill".to_string(),
            room_type: RoomKind::Lounge,
            player_count: 2,
            max_players: 8,
        }
    }

    fn pose_at(x: f32, yaw: f32) -> AvatarPose {
        let head = TrackedPose::new(Vec3::new(x, 1.7, 0.0), Quat::from_yaw_degrees(yaw));
        AvatarPose {
            root_position: Vec3::new(x, 0.0, 0.0),
            root_yaw: yaw,
            head,
            left_hand: head,
            right_hand: head,
        }
    }

    fn vr_position(sender: &str, room: RoomCode, pose: AvatarPose) -> Envelope {
        envelope(
            message_types::VR_POSITION,
            sender,
            &VrPositionPayload {
                room_id: room,
                room_type: RoomKind::Lounge,
                pose,
            },
        )
    }

    /// Engine joined to ABC234 as "me" with "bob" in the roster.
    fn joined() -> (ReplicationEngine, Arc<RecordingOutbound>) {
        let out = Arc::new(RecordingOutbound::new());
        let mut engine = ReplicationEngine::new(ReplicationConfig::default(), out.clone());
        engine.on_room_event(&RoomEvent::Connected {
            peer_id: PeerId::from("me"),
        });
        engine.on_room_event(&RoomEvent::RoomJoined { room: room_info() });
        engine.on_room_event(&RoomEvent::PeerJoined {
            room_code: code(),
            peer: RosterEntry {
                peer_id: PeerId::from("bob"),
                display_name: "Bob".to_string(),
                is_host: true,
                sub_area: RoomKind::Lounge,
            },
            newcomer: false,
        });
        (engine, out)
    }

    #[test]
    fn publishes_at_fixed_rate() {
        let (mut engine, out) = joined();
        engine.set_local_pose(pose_at(1.0, 90.0));

        // 30 Hz over one second of 10 ms ticks.
        for _ in 0..100 {
            engine.tick(Duration::from_millis(10));
        }
        let sent: Vec<VrPositionPayload> = out.payloads(message_types::VR_POSITION);
        assert!((29..=31).contains(&sent.len()), "sent {}", sent.len());
        assert_eq!(sent[0].room_id, code());
        assert_eq!(sent[0].room_type, RoomKind::Lounge);
        assert_eq!(sent[0].pose, pose_at(1.0, 90.0));
    }

    #[test]
    fn does_not_publish_outside_a_room() {
        let out = Arc::new(RecordingOutbound::new());
        let mut engine = ReplicationEngine::new(ReplicationConfig::default(), out.clone());
        engine.tick(Duration::from_secs(1));
        assert!(out.types().is_empty());
    }

    #[test]
    fn long_stall_publishes_once() {
        let (mut engine, out) = joined();
        engine.tick(Duration::from_secs(5));
        engine.tick(Duration::from_millis(1));
        assert_eq!(out.types().len(), 1);
    }

    #[test]
    fn first_update_is_applied_directly() {
        let (mut engine, _) = joined();
        let bob = PeerId::from("bob");
        assert_eq!(engine.remote_pose(&bob), None);

        engine
            .handle_envelope(&vr_position("bob", code(), pose_at(5.0, 45.0)))
            .unwrap();
        assert_eq!(engine.remote_pose(&bob), Some(&pose_at(5.0, 45.0)));
    }

    #[test]
    fn later_updates_are_smoothed() {
        let (mut engine, _) = joined();
        let bob = PeerId::from("bob");
        engine
            .handle_envelope(&vr_position("bob", code(), pose_at(0.0, 0.0)))
            .unwrap();
        engine
            .handle_envelope(&vr_position("bob", code(), pose_at(10.0, 0.0)))
            .unwrap();

        // Target stored, not applied.
        assert_eq!(engine.remote_pose(&bob).unwrap().root_position.x, 0.0);

        engine.tick(Duration::from_millis(50));
        let x = engine.remote_pose(&bob).unwrap().root_position.x;
        assert!((x - 5.0).abs() < 1e-3, "x = {x}");
    }

    #[test]
    fn interpolation_converges_and_stays_at_rest() {
        let (mut engine, _) = joined();
        let bob = PeerId::from("bob");
        engine
            .handle_envelope(&vr_position("bob", code(), pose_at(0.0, 0.0)))
            .unwrap();
        let target = pose_at(3.0, 120.0);
        engine
            .handle_envelope(&vr_position("bob", code(), target))
            .unwrap();

        for _ in 0..600 {
            engine.tick(Duration::from_millis(16));
        }
        let settled = *engine.remote_pose(&bob).unwrap();
        assert!(settled.approx_eq(&target, 1e-3));

        for _ in 0..100 {
            engine.tick(Duration::from_millis(16));
        }
        assert_eq!(engine.remote_pose(&bob), Some(&settled));
    }

    #[test]
    fn updates_for_other_rooms_are_ignored() {
        let (mut engine, _) = joined();
        engine
            .handle_envelope(&vr_position(
                "bob",
                RoomCode::from_normalized("OTHER2"),
                pose_at(1.0, 0.0),
            ))
            .unwrap();
        assert_eq!(engine.remote_pose(&PeerId::from("bob")), None);
    }

    #[test]
    fn updates_for_unknown_peers_are_ignored() {
        let (mut engine, _) = joined();
        engine
            .handle_envelope(&vr_position("carol", code(), pose_at(1.0, 0.0)))
            .unwrap();
        assert_eq!(engine.remote_pose(&PeerId::from("carol")), None);
        assert_eq!(engine.tracked_peers(), 1);
    }

    #[test]
    fn non_finite_pose_is_malformed() {
        let (mut engine, _) = joined();
        let err = engine
            .handle_envelope(&vr_position("bob", code(), pose_at(f32::NAN, 0.0)))
            .unwrap_err();
        assert!(matches!(err, SessionError::MalformedPayload { .. }));
        assert_eq!(engine.remote_pose(&PeerId::from("bob")), None);
    }

    #[test]
    fn peer_left_and_room_left_drop_state() {
        let (mut engine, _) = joined();
        let bob = PeerId::from("bob");
        engine
            .handle_envelope(&vr_position("bob", code(), pose_at(1.0, 0.0)))
            .unwrap();

        engine.on_room_event(&RoomEvent::PeerLeft {
            room_code: code(),
            peer_id: bob.clone(),
        });
        assert_eq!(engine.remote(&bob), None);

        engine.on_room_event(&RoomEvent::RoomLeft {
            room_code: code(),
            reason: crate::room::LeaveReason::Requested,
        });
        assert_eq!(engine.room_code(), None);
    }

    #[test]
    fn local_sub_area_change_tags_publishes() {
        let (mut engine, out) = joined();
        engine.on_room_event(&RoomEvent::SubAreaChanged {
            peer_id: PeerId::from("me"),
            sub_area: RoomKind::Gallery,
        });
        engine.tick(Duration::from_millis(40));
        let sent: Vec<VrPositionPayload> = out.payloads(message_types::VR_POSITION);
        assert_eq!(sent.last().map(|p| p.room_type), Some(RoomKind::Gallery));
    }

    #[test]
    fn local_peer_is_never_tracked() {
        let (mut engine, _) = joined();
        engine.on_room_event(&RoomEvent::PeerJoined {
            room_code: code(),
            peer: RosterEntry {
                peer_id: PeerId::from("me"),
                display_name: "Me".to_string(),
                is_host: false,
                sub_area: RoomKind::Lounge,
            },
            newcomer: false,
        });
        assert_eq!(engine.tracked_peers(), 1);
    }
}
