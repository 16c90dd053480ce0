//! Conduit configuration system.
//!
//! TOML-based configuration for the RPC client and its transports. All
//! sections use serde defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use conduit_config::{config_to_json, load_default, validation};
//!
//! let config = load_default().expect("failed to load config");
//! validation::validate(&config).expect("invalid config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    BatchConfig, ClientConfig, ConduitConfig, LogLevel, LoggingConfig, SocketConfig,
    TransportKind, CONFIG_SCHEMA_VERSION,
};
pub use toml_loader::{
    create_default_config, default_config_path, load_default, load_from_path, CONFIG_PATH_ENV,
};

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &ConduitConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
