//! Subcommand implementations.

mod call;
mod listen;
mod split;

use conduit_common::ConduitError;
use conduit_config::ConduitConfig;

use crate::cli::Command;

pub async fn run(command: Command, config: ConduitConfig) -> Result<(), ConduitError> {
    match command {
        Command::Call { method, params } => call::run(&config, &method, params.as_deref()).await,
        Command::Listen { id, count } => listen::run(&config, id, count).await,
        Command::Split { file } => split::run(file.as_deref()),
    }
}
