//! Roster & Pose Replication Engine.
//!
//! Publishes the local avatar pose at a fixed rate while in a room and
//! smooths remote poses toward the latest received snapshot.

mod engine;
mod types;

pub use engine::{ReplicationEngine, SUBSCRIBED_TYPES};
pub use types::{RemotePeer, ReplicationConfig};
