pub mod errors;
pub mod id;
pub mod types;

pub use errors::{
    ConduitError, ConfigError, ProtocolError, RpcError, SplitError, TransportError,
};
pub use id::{new_correlation_id, new_session_token};
pub use types::ProtocolVersion;

pub type Result<T> = std::result::Result<T, ConduitError>;
