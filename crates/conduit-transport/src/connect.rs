//! Open the transport selected by a [`ConduitConfig`].

use std::sync::Arc;

use conduit_common::ConduitError;
use conduit_config::{validation, ConduitConfig, TransportKind};
use conduit_rpc::{RpcClient, Transport};
use tracing::info;

use crate::batch::BatchTransport;
use crate::socket::SocketTransport;

/// Validate `config` and open the transport it selects.
pub async fn connect(config: &ConduitConfig) -> Result<Arc<dyn Transport>, ConduitError> {
    validation::validate(config)?;

    let conn: Arc<dyn Transport> = match config.client.transport {
        TransportKind::Socket => Arc::new(SocketTransport::connect(&config.socket).await?),
        TransportKind::Batch => Arc::new(BatchTransport::new(&config.batch)?),
    };
    info!(transport = ?config.client.transport, "transport connected");
    Ok(conn)
}

/// [`connect`], then attach a client speaking the configured protocol version.
pub async fn open_client(config: &ConduitConfig) -> Result<RpcClient, ConduitError> {
    let conn = connect(config).await?;
    Ok(RpcClient::new(conn, config.client.protocol_version))
}
