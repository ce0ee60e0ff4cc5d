//! Room Lifecycle Manager.
//!
//! Owns the local session state (current room, role, sub-area, roster
//! identity fields) and the cache of rooms advertised by other hosts.
//! State machine: `Disconnected -> Idle -> InRoom(host | guest)`.

mod manager;
mod types;


pub use manager::{RoomManager, SUBSCRIBED_TYPES};
pub use types::{
    CurrentRoom, HostLossPolicy, LeaveReason, Phase, RoomConfig, RoomEvent, RoomRole, RosterEntry,
};
