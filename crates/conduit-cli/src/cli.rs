use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use conduit_common::ProtocolVersion;
use conduit_config::{ConduitConfig, TransportKind};

/// conduit: JSON-RPC client over WebSocket or batched HTTP.
#[derive(Parser, Debug)]
#[command(name = "conduit", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter override, e.g. `debug` or `conduit_rpc=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Transport to use instead of the configured one.
    #[arg(long, global = true, value_enum)]
    pub transport: Option<TransportArg>,

    /// Endpoint URL for the selected transport.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// JSON-RPC version: 1, 1.1 or 2.0.
    #[arg(long, global = true)]
    pub protocol: Option<ProtocolVersion>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one request and print its result.
    Call {
        method: String,
        /// Params as JSON. Defaults to null.
        params: Option<String>,
    },
    /// Print messages from a push channel.
    Listen {
        /// Channel id; push channels are negative.
        #[arg(allow_negative_numbers = true)]
        id: i64,
        /// Stop after this many messages.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Split a batch body into one JSON value per line.
    Split {
        /// Input file; reads stdin when omitted.
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportArg {
    Socket,
    Batch,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Socket => TransportKind::Socket,
            TransportArg::Batch => TransportKind::Batch,
        }
    }
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut ConduitConfig) {
        if let Some(transport) = self.transport {
            config.client.transport = transport.into();
        }
        if let Some(protocol) = self.protocol {
            config.client.protocol_version = protocol;
        }
        if let Some(url) = &self.url {
            match config.client.transport {
                TransportKind::Socket => config.socket.url = url.clone(),
                TransportKind::Batch => config.batch.url = url.clone(),
            }
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
