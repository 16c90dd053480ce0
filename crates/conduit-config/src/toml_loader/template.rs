//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Conduit Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[client]
# protocol_version = "2.0"   # "1", "1.1", "2.0"
# transport = "socket"       # socket, batch

[socket]
# url = "ws://127.0.0.1:8080/rpc"
# connect_timeout_secs = 15  # 1-300

[batch]
# url = "http://127.0.0.1:8080/rpc"
# debounce_ms = 0            # 0-10000, 0 = next scheduling tick
# poll_interval_ms = 1000    # 0 disables polling, else 50-600000
# session_param = "session"
# request_timeout_secs = 30  # 1-300

[logging]
# level = "INFO"             # DEBUG, INFO, WARNING, ERROR
"##
}
