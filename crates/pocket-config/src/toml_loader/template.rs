//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# PocketLLM client configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[backend]
# base_url = "http://127.0.0.1:8000"
# connect_timeout_secs = 10     # 1-120
# request_timeout_secs = 30     # 1-600, not applied to streamed replies

[chat]
# temperature = 0.7             # 0.0-2.0
# title_prefix_chars = 30       # 1-200

[logging]
# level = "INFO"                # DEBUG, INFO, WARNING, ERROR
"##
}
