//! Correlation engine for JSON-RPC over a pluggable transport.
//!
//! Many concurrent requests and long-lived push channels share one
//! connection. Requests use non-negative ids and resolve once; push
//! channels use negative ids and may fire any number of times.
//!
//! ```rust,ignore
//! let conn = MemoryTransport::new();
//! let client = RpcClient::new(Arc::new(conn.clone()), ProtocolVersion::V2);
//! let reply = client.request("ping", serde_json::json!({}))?;
//! conn.deliver(r#"{"id":0,"result":"pong"}"#);
//! assert_eq!(reply.await?, "pong");
//! ```

pub mod client;
pub mod pipe;
pub mod subscription;
pub mod transport;
pub mod wire;

pub use client::{Reply, RpcClient};
pub use conduit_common::{ProtocolError, ProtocolVersion, RpcError, TransportError};
pub use pipe::{Pipe, Receiver};
pub use subscription::{CancelHandle, Emitter, SplitCancel, Subscription, SubscriptionStream};
pub use transport::{ErrorHandler, MemoryTransport, MessageHandler, Transport};
