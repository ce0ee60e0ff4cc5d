//! Where the config file lives, and seeding it on first run.

use std::path::{Path, PathBuf};

use plaza_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "plaza";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/plaza/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the documented template to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |what: &str, e: std::io::Error| {
        ConfigError::ParseError(format!("{what} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("cannot create directory for", e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_error("cannot write", e))?;

    info!(path = %path.display(), "Wrote default config");
    Ok(())
}
