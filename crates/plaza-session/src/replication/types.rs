use std::time::Duration;

use crate::pose::AvatarPose;
use crate::protocol::RoomKind;

#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Minimum time between two local pose broadcasts.
    pub publish_interval: Duration,
    /// Fraction of the remaining distance covered per second of smoothing.
    pub interpolation_rate: f32,
}

impl ReplicationConfig {
    pub fn from_rate_hz(publish_rate_hz: u32, interpolation_rate: f32) -> Self {
        Self {
            publish_interval: Duration::from_secs_f64(1.0 / f64::from(publish_rate_hz.max(1))),
            interpolation_rate,
        }
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self::from_rate_hz(30, 10.0)
    }
}

/// Replicated state of one remote roster member.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePeer {
    pub sub_area: RoomKind,
    /// Latest pose received from the peer.
    pub target: Option<AvatarPose>,
    /// Pose to render. Held at spawn until the first update arrives.
    pub displayed: Option<AvatarPose>,
    pub updates_received: u64,
}

impl RemotePeer {
    pub(crate) fn spawned(sub_area: RoomKind) -> Self {
        Self {
            sub_area,
            target: None,
            displayed: None,
            updates_received: 0,
        }
    }
}
