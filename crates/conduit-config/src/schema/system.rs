//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// `tracing` filter directive for the conduit crates at this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "conduit=debug",
            LogLevel::Info => "conduit=info",
            LogLevel::Warning => "conduit=warn",
            LogLevel::Error => "conduit=error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_uppercase_serialization() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"DEBUG\""));
    }

    #[test]
    fn directives() {
        assert_eq!(LogLevel::default().directive(), "conduit=info");
        assert_eq!(LogLevel::Warning.directive(), "conduit=warn");
    }
}
