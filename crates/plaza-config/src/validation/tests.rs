use super::*;

#[test]
fn default_config_is_valid() {
    assert!(validate(&PlazaConfig::default()).is_ok());
}

#[test]
fn publish_rate_out_of_range() {
    let mut config = PlazaConfig::default();
    config.replication.publish_rate_hz = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("replication.publish_rate_hz = 0"));

    config.replication.publish_rate_hz = 121;
    assert!(validate(&config).is_err());
}

#[test]
fn interpolation_rate_rejects_nan() {
    let mut config = PlazaConfig::default();
    config.replication.interpolation_rate = f64::NAN;
    assert!(validate(&config).is_err());
}

#[test]
fn max_players_bounds() {
    let mut config = PlazaConfig::default();
    config.room.max_players = 1;
    assert!(validate(&config).is_err());
    config.room.max_players = 64;
    assert!(validate(&config).is_ok());
}

#[test]
fn url_scheme_must_be_websocket() {
    let mut config = PlazaConfig::default();
    config.transport.url = "http://relay.example:7878".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("transport.url"));

    config.transport.url = "wss://relay.example/ws".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn display_name_length() {
    let mut config = PlazaConfig::default();
    config.identity.display_name = "   ".into();
    assert!(validate(&config).is_err());

    config.identity.display_name = "x".repeat(33);
    assert!(validate(&config).is_err());

    config.identity.display_name = "Ünïcödé".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn all_errors_are_collected() {
    let mut config = PlazaConfig::default();
    config.transport.connect_timeout_ms = 10;
    config.transport.reconnect_delay_ms = 10;
    config.room.max_players = 100;
    let err = validate(&config).unwrap_err().to_string();
    assert_eq!(err.matches("out of range").count(), 3);
}
