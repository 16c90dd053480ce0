//! Transport adapter settings: persistent socket and batched HTTP polling.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// WebSocket transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub url: String,
    /// Handshake timeout in seconds (valid range: 1-300).
    pub connect_timeout_secs: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/rpc".into(),
            connect_timeout_secs: 15,
        }
    }
}

/// Batched HTTP polling transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub url: String,
    /// Extra coalescing window before a flush, in milliseconds.
    /// 0 flushes on the next scheduling tick.
    pub debounce_ms: u32,
    /// Poll interval in milliseconds; 0 disables polling.
    pub poll_interval_ms: u32,
    /// Query parameter carrying the session token.
    pub session_param: String,
    /// Per-request HTTP timeout in seconds (valid range: 1-300).
    pub request_timeout_secs: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/rpc".into(),
            debounce_ms: 0,
            poll_interval_ms: 1000,
            session_param: "session".into(),
            request_timeout_secs: 30,
        }
    }
}

impl BatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(u64::from(self.debounce_ms))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(u64::from(self.poll_interval_ms)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.request_timeout_secs))
    }
}
