//! Core TOML config loading: read from path or platform default.

use crate::schema::PlazaConfig;
use crate::validation;
use plaza_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. A file that parses but fails
/// validation is returned as-is with a warning; callers that need a valid
/// config run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<PlazaConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: PlazaConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Config has invalid values");
    }

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/plaza/config.toml`
/// On macOS: `~/Library/Application Support/plaza/config.toml`
///
/// If the file does not exist, writes the documented default and returns
/// defaults.
pub fn load_default() -> Result<PlazaConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "No config found, creating default");
            create_default_config(&path)?;
            Ok(PlazaConfig::default())
        }
        Err(e) => Err(e),
    }
}
