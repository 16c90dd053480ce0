//! Core TOML config loading: read from path or platform default.

use crate::schema::ConduitConfig;
use crate::validation;
use conduit_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take serde defaults. Validation problems are logged
/// and the parsed config is returned as-is; callers that open a
/// connection validate again and refuse.
pub fn load_from_path(path: &Path) -> Result<ConduitConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config: ConduitConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "config has invalid values");
    }

    info!(path = %path.display(), transport = ?config.client.transport, "config loaded");
    Ok(config)
}

/// Load config from [`default_config_path`], writing a commented default
/// file first if there is none.
pub fn load_default() -> Result<ConduitConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "no config file yet");
            create_default_config(&path)?;
            Ok(ConduitConfig::default())
        }
        Err(e) => Err(e),
    }
}
