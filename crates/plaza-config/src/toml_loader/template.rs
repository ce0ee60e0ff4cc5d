//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Plaza Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[transport]
url = "ws://127.0.0.1:7878"
# connect_timeout_ms = 5000    # 100-60000
# reconnect_delay_ms = 2000    # 100-300000, fixed delay between attempts
# auto_reconnect = true

[identity]
display_name = "Guest"         # 1-32 characters

[room]
# max_players = 8              # 2-64, capacity of rooms you host
# join_timeout_secs = 10       # 0 waits forever for the host's roster
# host_loss_policy = "close"   # "close" or "stay" when the host drops

[replication]
# publish_rate_hz = 30         # 1-120
# interpolation_rate = 10.0    # 0.1-100.0

[voice]
# enabled = false
# auto_start = true            # call newcomers automatically

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
