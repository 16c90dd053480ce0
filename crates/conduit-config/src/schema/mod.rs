//! Configuration schema types for conduit.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod system;
mod transport;

pub use system::*;
pub use transport::*;

use conduit_common::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConduitConfig {
    pub client: ClientConfig,
    pub socket: SocketConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Which transport adapter carries the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Socket,
    Batch,
}

/// Correlation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub protocol_version: ProtocolVersion,
    pub transport: TransportKind,
}
