//! Full configuration validation.
//!
//! Each section has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod transport;


use crate::schema::ConduitConfig;
use conduit_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ConduitConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    transport::validate_socket(&mut errors, config);
    transport::validate_batch(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
