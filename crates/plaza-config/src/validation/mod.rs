//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator calls them all and
//! collects errors into a single `ConfigError`.

mod helpers;
mod session;

#[cfg(test)]
mod tests;

use crate::schema::PlazaConfig;
use plaza_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &PlazaConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    session::validate_transport(&mut errors, config);
    session::validate_identity(&mut errors, config);
    session::validate_room(&mut errors, config);
    session::validate_replication(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
