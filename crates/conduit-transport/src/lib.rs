//! Network transports for the conduit RPC client.
//!
//! - [`SocketTransport`]: one persistent WebSocket connection.
//! - [`BatchTransport`]: coalesced HTTP POSTs plus optional polling.
//! - [`split`]: streaming splitter for concatenated JSON batch bodies.
//! - [`connect`]: pick and open an adapter from a [`ConduitConfig`].
//!
//! [`ConduitConfig`]: conduit_config::ConduitConfig

pub mod batch;
pub mod connect;
pub mod socket;
pub mod split;

pub use batch::BatchTransport;
pub use connect::{connect, open_client};
pub use socket::SocketTransport;
pub use split::split;
