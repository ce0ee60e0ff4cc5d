//! Session configuration types: relay connection, identity, rooms, and
//! pose replication.

use serde::{Deserialize, Serialize};

/// Connection to the relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// WebSocket URL of the relay (`ws://` or `wss://`).
    pub url: String,
    /// Handshake timeout in milliseconds (valid range: 100-60000).
    pub connect_timeout_ms: u32,
    /// Fixed delay between reconnect attempts (valid range: 100-300000).
    pub reconnect_delay_ms: u32,
    pub auto_reconnect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:7878".into(),
            connect_timeout_ms: 5000,
            reconnect_delay_ms: 2000,
            auto_reconnect: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name shown to other participants (1-32 characters).
    pub display_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            display_name: "Guest".into(),
        }
    }
}

/// What a guest does when its host drops without closing the room.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HostLossPolicy {
    #[default]
    Close,
    Stay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Capacity of rooms hosted locally (valid range: 2-64).
    pub max_players: u32,
    /// Seconds to wait for the host's roster after joining; 0 waits forever.
    pub join_timeout_secs: u32,
    pub host_loss_policy: HostLossPolicy,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            join_timeout_secs: 10,
            host_loss_policy: HostLossPolicy::Close,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Local pose broadcasts per second (valid range: 1-120).
    pub publish_rate_hz: u32,
    /// Smoothing rate for remote poses (valid range: 0.1-100.0).
    pub interpolation_rate: f64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            publish_rate_hz: 30,
            interpolation_rate: 10.0,
        }
    }
}
