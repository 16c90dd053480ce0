//! Where the config file lives.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use conduit_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// Overrides the platform config location when set and non-empty.
pub const CONFIG_PATH_ENV: &str = "CONDUIT_CONFIG";

/// `$CONDUIT_CONFIG`, else `<platform config dir>/conduit/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

fn resolve(env: Option<OsString>, platform_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    platform_dir
        .map(|dir| dir.join("conduit").join("config.toml"))
        .ok_or_else(|| {
            ConfigError::ParseError(format!(
                "no platform config directory; set {CONFIG_PATH_ENV}"
            ))
        })
}

/// Write the commented default config to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |action: &str, e: std::io::Error| {
        ConfigError::ParseError(format!("cannot {action} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create directory for", e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_error("write", e))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
