//! Maps the on-disk configuration onto the session runtime configs.

use std::time::Duration;

use plaza_config::schema;
use plaza_config::PlazaConfig;
use plaza_session::{
    CallConfig, HostLossPolicy, ParticipantConfig, ReplicationConfig, RoomConfig, TransportConfig,
};

/// Used when neither `RUST_LOG`, `--log-level` nor the config file say
/// otherwise.
pub const DEFAULT_LOG_DIRECTIVE: &str = "plaza=info";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Filter directive for the subscriber. A bare level is scoped to the plaza
/// crates; anything else is passed through as a full directive.
pub fn log_directive(cli_level: Option<&str>, config: Option<&PlazaConfig>) -> String {
    match (cli_level, config) {
        (Some(level), _) if LEVELS.contains(&level.to_ascii_lowercase().as_str()) => {
            format!("plaza={}", level.to_ascii_lowercase())
        }
        (Some(directive), _) => directive.to_string(),
        (None, Some(config)) => format!("plaza={}", config.logging.level.as_str()),
        (None, None) => DEFAULT_LOG_DIRECTIVE.to_string(),
    }
}

pub fn transport_config(config: &schema::TransportConfig) -> TransportConfig {
    TransportConfig {
        url: config.url.clone(),
        connect_timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
        reconnect_delay: Duration::from_millis(u64::from(config.reconnect_delay_ms)),
        auto_reconnect: config.auto_reconnect,
    }
}

pub fn participant_config(config: &PlazaConfig, name_override: Option<&str>) -> ParticipantConfig {
    let display_name = name_override
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&config.identity.display_name)
        .to_string();

    ParticipantConfig {
        display_name,
        room: RoomConfig {
            max_players: config.room.max_players,
            join_timeout: match config.room.join_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(u64::from(secs))),
            },
            host_loss_policy: match config.room.host_loss_policy {
                schema::HostLossPolicy::Close => HostLossPolicy::CloseRoom,
                schema::HostLossPolicy::Stay => HostLossPolicy::Stay,
            },
        },
        replication: ReplicationConfig::from_rate_hz(
            config.replication.publish_rate_hz,
            config.replication.interpolation_rate as f32,
        ),
        call: CallConfig {
            enabled: config.voice.enabled,
            auto_start: config.voice.auto_start,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_beats_config() {
        let mut config = PlazaConfig::default();
        config.logging.level = schema::LogLevel::Warn;

        assert_eq!(log_directive(Some("DEBUG"), Some(&config)), "plaza=debug");
        assert_eq!(log_directive(None, Some(&config)), "plaza=warn");
        assert_eq!(log_directive(None, None), DEFAULT_LOG_DIRECTIVE);
    }

    #[test]
    fn full_directive_passes_through() {
        assert_eq!(
            log_directive(Some("plaza_session=trace,plaza_app=info"), None),
            "plaza_session=trace,plaza_app=info"
        );
    }

    #[test]
    fn transport_durations_come_from_millis() {
        let transport = transport_config(&schema::TransportConfig {
            url: "ws://relay.local:9000".into(),
            connect_timeout_ms: 1500,
            reconnect_delay_ms: 250,
            auto_reconnect: false,
        });
        assert_eq!(transport.url, "ws://relay.local:9000");
        assert_eq!(transport.connect_timeout, Duration::from_millis(1500));
        assert_eq!(transport.reconnect_delay, Duration::from_millis(250));
        assert!(!transport.auto_reconnect);
    }

    #[test]
    fn defaults_map_onto_session_defaults() {
        let participant = participant_config(&PlazaConfig::default(), None);
        assert_eq!(participant.display_name, "Guest");
        assert_eq!(participant.room.max_players, 8);
        assert_eq!(participant.room.join_timeout, Some(Duration::from_secs(10)));
        assert_eq!(participant.room.host_loss_policy, HostLossPolicy::CloseRoom);
        assert_eq!(
            participant.replication.publish_interval,
            ReplicationConfig::default().publish_interval
        );
        assert!(!participant.call.enabled);
        assert!(participant.call.auto_start);
    }

    #[test]
    fn zero_join_timeout_waits_forever() {
        let mut config = PlazaConfig::default();
        config.room.join_timeout_secs = 0;
        config.room.host_loss_policy = schema::HostLossPolicy::Stay;

        let participant = participant_config(&config, None);
        assert_eq!(participant.room.join_timeout, None);
        assert_eq!(participant.room.host_loss_policy, HostLossPolicy::Stay);
    }

    #[test]
    fn name_override_ignores_blank() {
        let config = PlazaConfig::default();
        assert_eq!(participant_config(&config, Some(" Ada ")).display_name, "Ada");
        assert_eq!(participant_config(&config, Some("   ")).display_name, "Guest");
    }
}
