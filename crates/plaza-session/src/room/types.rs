//! Types, configuration, and events for the room lifecycle.

use std::collections::BTreeMap;
use std::time::Duration;

use plaza_common::{PeerId, RoomCode, SessionError};

use crate::protocol::{PlayerInfo, RoomInfo, RoomKind};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What a guest does when the relay reports its host gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostLossPolicy {
    /// Treat it like an explicit `room-closed` and return to Idle.
    #[default]
    CloseRoom,
    /// Stay in the hostless room until the user leaves.
    Stay,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity advertised for rooms created locally.
    pub max_players: u32,
    /// How long a guest waits for `room-welcome`. `None` waits forever.
    pub join_timeout: Option<Duration>,
    pub host_loss_policy: HostLossPolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            join_timeout: Some(Duration::from_secs(10)),
            host_loss_policy: HostLossPolicy::CloseRoom,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Idle,
    InRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRole {
    Host,
    Guest,
}

/// Identity fields of one roster member. Pose data lives in the
/// replication engine, keyed by the same peer id.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub peer_id: PeerId,
    pub display_name: String,
    pub is_host: bool,
    pub sub_area: RoomKind,
}

impl RosterEntry {
    pub(crate) fn to_player_info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.peer_id.clone(),
            player_name: self.display_name.clone(),
            is_host: self.is_host,
            room_type: self.sub_area,
        }
    }
}

/// The room the local participant is in.
#[derive(Debug, Clone)]
pub struct CurrentRoom {
    pub info: RoomInfo,
    pub role: RoomRole,
    /// Local participant's current sub-area.
    pub sub_area: RoomKind,
    pub roster: BTreeMap<PeerId, RosterEntry>,
    /// Time spent waiting for the host's `room-welcome`; `None` once it
    /// arrived (or for hosts).
    pub(crate) awaiting_welcome: Option<Duration>,
}

impl CurrentRoom {
    pub fn code(&self) -> &RoomCode {
        &self.info.room_id
    }

    pub fn is_host(&self) -> bool {
        self.role == RoomRole::Host
    }

    /// Guests hold a provisional roster until the host's snapshot arrives.
    pub fn is_provisional(&self) -> bool {
        self.awaiting_welcome.is_some()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Requested,
    Closed,
    HostLost,
    Disconnected,
    JoinTimedOut,
}

/// Events emitted by the room lifecycle for the UI and for the other
/// session components.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Connected {
        peer_id: PeerId,
    },
    Disconnected,
    RoomCreated {
        room: RoomInfo,
    },
    /// Raised optimistically before the host's roster arrives.
    RoomJoined {
        room: RoomInfo,
    },
    /// The host's roster snapshot was applied.
    RosterConfirmed {
        room: RoomInfo,
    },
    PeerJoined {
        room_code: RoomCode,
        peer: RosterEntry,
        /// `true` when the peer joined after us, `false` when learned from
        /// a roster snapshot.
        newcomer: bool,
    },
    PeerLeft {
        room_code: RoomCode,
        peer_id: PeerId,
    },
    SubAreaChanged {
        peer_id: PeerId,
        sub_area: RoomKind,
    },
    PeerRenamed {
        peer_id: PeerId,
        display_name: String,
    },
    RoomLeft {
        room_code: RoomCode,
        reason: LeaveReason,
    },
    RoomListUpdated {
        rooms: Vec<RoomInfo>,
    },
    Error(SessionError),
}
