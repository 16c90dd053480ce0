use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// JSON-RPC dialect spoken on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProtocolVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "1.1")]
    V1_1,
    #[default]
    #[serde(rename = "2.0")]
    V2,
}

impl ProtocolVersion {
    /// Value of the `jsonrpc` member, absent for version 1.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            ProtocolVersion::V1 => None,
            ProtocolVersion::V1_1 => Some("1.1"),
            ProtocolVersion::V2 => Some("2.0"),
        }
    }

    /// Whether params are wrapped in a single-element array.
    pub fn positional_params(self) -> bool {
        !matches!(self, ProtocolVersion::V2)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "1"),
            ProtocolVersion::V1_1 => write!(f, "1.1"),
            ProtocolVersion::V2 => write!(f, "2.0"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "1.0" => Ok(ProtocolVersion::V1),
            "1.1" => Ok(ProtocolVersion::V1_1),
            "2" | "2.0" => Ok(ProtocolVersion::V2),
            other => Err(format!("unknown protocol version '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_per_version() {
        assert_eq!(ProtocolVersion::V1.tag(), None);
        assert_eq!(ProtocolVersion::V1_1.tag(), Some("1.1"));
        assert_eq!(ProtocolVersion::V2.tag(), Some("2.0"));
    }

    #[test]
    fn only_v2_uses_named_params() {
        assert!(ProtocolVersion::V1.positional_params());
        assert!(ProtocolVersion::V1_1.positional_params());
        assert!(!ProtocolVersion::V2.positional_params());
    }

    #[test]
    fn parse_accepts_short_forms() {
        assert_eq!("1".parse(), Ok(ProtocolVersion::V1));
        assert_eq!("1.0".parse(), Ok(ProtocolVersion::V1));
        assert_eq!("1.1".parse(), Ok(ProtocolVersion::V1_1));
        assert_eq!("2".parse(), Ok(ProtocolVersion::V2));
        assert!("3".parse::<ProtocolVersion>().is_err());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&ProtocolVersion::V1_1).unwrap();
        assert_eq!(json, "\"1.1\"");
        let parsed: ProtocolVersion = serde_json::from_str("\"2.0\"").unwrap();
        assert_eq!(parsed, ProtocolVersion::V2);
    }

    #[test]
    fn default_is_v2() {
        assert_eq!(ProtocolVersion::default(), ProtocolVersion::V2);
        assert_eq!(ProtocolVersion::default().to_string(), "2.0");
    }
}
