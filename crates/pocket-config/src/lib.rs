//! PocketLLM client configuration.
//!
//! TOML-based configuration for the chat client: backend address and
//! timeouts, chat defaults, and logging. All sections use serde defaults so
//! partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pocket_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.backend.base_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{BackendConfig, ChatConfig, LogLevel, LoggingConfig, PocketConfig};

use std::path::Path;

use pocket_common::ConfigError;

/// Load config from the platform default path, creating a commented
/// default file if none exists, and validate the result.
pub fn load_config() -> Result<PocketConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path. Unlike [`load_config`], a missing
/// file is an error rather than a reason to create one.
pub fn load_config_from(path: &Path) -> Result<PocketConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}
