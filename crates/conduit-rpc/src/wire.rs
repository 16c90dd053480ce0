//! JSON-RPC framing for each protocol version.

use conduit_common::{ProtocolError, ProtocolVersion, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
struct RequestFrame<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    jsonrpc: Option<&'static str>,
    method: &'a str,
    id: i64,
    params: Value,
}

/// Serialize one request.
///
/// | version | shape |
/// |---|---|
/// | 1   | `{method, id, params:[params]}` |
/// | 1.1 | `{jsonrpc:"1.1", method, id, params:[params]}` |
/// | 2   | `{jsonrpc:"2.0", method, id, params}` |
pub fn encode_request(
    version: ProtocolVersion,
    method: &str,
    id: i64,
    params: Value,
) -> Result<String, RpcError> {
    let params = if version.positional_params() {
        Value::Array(vec![params])
    } else {
        params
    };
    let frame = RequestFrame {
        jsonrpc: version.tag(),
        method,
        id,
        params,
    };
    serde_json::to_string(&frame).map_err(|e| RpcError::Usage(format!("unserializable params: {e}")))
}

/// An inbound response or push message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl InboundMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The id as an integer, if it can be read as one.
    pub fn id(&self) -> Option<i64> {
        coerce_id(&self.id)
    }

    /// The error branch when `error` is present and non-null, else the result.
    ///
    /// Version 1 peers send `"error": null` on success, which is why null
    /// counts as absent.
    pub fn outcome(self) -> Result<Value, ProtocolError> {
        match self.error {
            Some(error) if !error.is_null() => Err(ProtocolError::from_value(&error)),
            _ => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Read an id as an integer: integers, integral floats and numeric strings.
pub fn coerce_id(id: &Value) -> Option<i64> {
    match id {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}
