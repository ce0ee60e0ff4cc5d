//! Plaza configuration system.
//!
//! TOML-based configuration with a documented default template and full
//! validation. All sections use sensible defaults so partial configs work
//! out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{PlazaConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use plaza_common::ConfigError;

/// Load and validate config from the platform default path, creating it
/// on first run.
pub fn load_config() -> Result<PlazaConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load and validate config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<PlazaConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &PlazaConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
