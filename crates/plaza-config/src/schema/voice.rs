use serde::{Deserialize, Serialize};

/// Voice call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Call newcomers automatically instead of waiting for a manual start.
    pub auto_start: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_start: true,
        }
    }
}
