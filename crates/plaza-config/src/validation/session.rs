//! Validation for the transport, identity, room, and replication sections.

use crate::schema::PlazaConfig;

use super::helpers::{validate_range, validate_range_f64};

const MAX_DISPLAY_NAME_CHARS: usize = 32;

pub(crate) fn validate_transport(errors: &mut Vec<String>, config: &PlazaConfig) {
    let url = config.transport.url.trim();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!(
            "transport.url = {url:?} must start with ws:// or wss://"
        ));
    }
    validate_range(
        errors,
        "transport.connect_timeout_ms",
        config.transport.connect_timeout_ms,
        100,
        60_000,
    );
    validate_range(
        errors,
        "transport.reconnect_delay_ms",
        config.transport.reconnect_delay_ms,
        100,
        300_000,
    );
}

pub(crate) fn validate_identity(errors: &mut Vec<String>, config: &PlazaConfig) {
    let chars = config.identity.display_name.trim().chars().count();
    if chars == 0 || chars > MAX_DISPLAY_NAME_CHARS {
        errors.push(format!(
            "identity.display_name must be 1-{MAX_DISPLAY_NAME_CHARS} characters (got {chars})"
        ));
    }
}

pub(crate) fn validate_room(errors: &mut Vec<String>, config: &PlazaConfig) {
    validate_range(errors, "room.max_players", config.room.max_players, 2, 64);
}

pub(crate) fn validate_replication(errors: &mut Vec<String>, config: &PlazaConfig) {
    validate_range(
        errors,
        "replication.publish_rate_hz",
        config.replication.publish_rate_hz,
        1,
        120,
    );
    validate_range_f64(
        errors,
        "replication.interpolation_rate",
        config.replication.interpolation_rate,
        0.1,
        100.0,
    );
}
