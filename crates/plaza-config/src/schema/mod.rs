//! Configuration schema types for Plaza.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod session;
mod system;
mod voice;

pub use session::*;
pub use system::*;
pub use voice::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for a Plaza participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlazaConfig {
    pub transport: TransportConfig,
    pub identity: IdentityConfig,
    pub room: RoomConfig,
    pub replication: ReplicationConfig,
    pub voice: VoiceConfig,
    pub logging: LoggingConfig,
}
