use std::path::PathBuf;

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failure reported by the remote peer for one request or push channel.
///
/// Fields are private so a delivered error cannot be altered by one
/// waiter before another sees it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("rpc error {code}: {message}")]
pub struct ProtocolError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl ProtocolError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Build from the `error` member of an inbound message.
    ///
    /// Peers are not always strict about the error object, so a bare
    /// string becomes the message and anything else is stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let code = map.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = match map.get("message") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let data = map.get("data").filter(|d| !d.is_null()).cloned();
                Self {
                    code,
                    message,
                    data,
                }
            }
            Value::String(s) => Self::new(0, s.clone()),
            other => Self::new(0, other.to_string()),
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

/// Diagnostic for a batch body that does not split into JSON values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed value #{index} at line {line}, column {column} (offset {offset}): {message}")]
pub struct SplitError {
    /// Position of the offending value within the batch.
    pub index: usize,
    pub line: usize,
    pub column: usize,
    /// Byte offset where the offending value starts.
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("send failed: {0}")]
    Send(String),

    #[error("connection closed by peer (code {code}): {reason}")]
    PeerClosed { code: u16, reason: String },

    #[error("connection lost: {0}")]
    Lost(String),

    #[error("http status {0}")]
    Http(u16),

    #[error("http error: {0}")]
    Request(String),

    #[error(transparent)]
    Malformed(#[from] SplitError),

    #[error("transport closed")]
    Closed,

    #[error("connection replaced")]
    ConnectionReplaced,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("session closed")]
    Closed,

    #[error("decode error: {0}")]
    Decode(String),
}

impl RpcError {
    /// True for errors that end the session rather than a single call.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::Closed)
    }

    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            RpcError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConduitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(String),

    #[error("{0}")]
    Other(String),
}
