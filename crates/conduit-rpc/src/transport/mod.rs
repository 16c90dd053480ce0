//! The capability an [`RpcClient`](crate::RpcClient) needs from a connection.

mod mem;

use std::sync::Arc;

use conduit_common::TransportError;

pub use mem::MemoryTransport;

/// Called once per inbound message with its raw text.
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Called at most once, when the connection fails for good.
pub type ErrorHandler = Arc<dyn Fn(TransportError) + Send + Sync>;

/// A message-oriented connection to a JSON-RPC peer.
///
/// Implementations must not hold internal locks while invoking the
/// handlers registered through [`Transport::when`]: the client may call
/// back into `send` from inside a handler.
pub trait Transport: Send + Sync {
    /// Queue one serialized frame for delivery.
    fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. A locally requested close reports nothing
    /// through the error handler.
    fn close(&self, code: Option<u16>, reason: Option<&str>);

    /// Register the inbound message and terminal error handlers,
    /// replacing any registered earlier.
    fn when(&self, on_message: MessageHandler, on_error: ErrorHandler);
}
