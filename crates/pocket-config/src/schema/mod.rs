//! Configuration schema types for the PocketLLM client.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod backend;
mod chat;
mod system;

pub use backend::*;
pub use chat::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PocketConfig {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_points_at_local_server() {
        let config = PocketConfig::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.backend.connect_timeout_secs, 10);
        assert_eq!(config.backend.request_timeout_secs, 30);
    }

    #[test]
    fn default_chat_settings() {
        let config = PocketConfig::default();
        assert!((config.chat.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.chat.title_prefix_chars, 30);
    }

    #[test]
    fn default_logging_is_info() {
        let config = PocketConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.level.as_directive(), "pocket=info");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: PocketConfig = toml::from_str("[chat]\ntemperature = 0.2\n").unwrap();
        assert!((config.chat.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.chat.title_prefix_chars, 30);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn log_level_parses_uppercase() {
        let config: PocketConfig = toml::from_str("[logging]\nlevel = \"WARNING\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.logging.level.as_directive(), "pocket=warn");
    }

    #[test]
    fn schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }
}
