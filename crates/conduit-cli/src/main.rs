mod cli;
mod commands;

use std::process::ExitCode;

use conduit_common::ConfigError;
use conduit_config::ConduitConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

const DEFAULT_DIRECTIVE: &str = "conduit=info";

fn load_config(args: &Args) -> Result<ConduitConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => conduit_config::load_from_path(path)?,
        None => conduit_config::load_default().unwrap_or_else(|e| {
            eprintln!("warning: config load failed, using defaults: {e}");
            ConduitConfig::default()
        }),
    };
    args.apply_overrides(&mut config);
    Ok(config)
}

/// `--log-level` wins, then `RUST_LOG`, then the config file.
fn log_directive(args: &Args, config: &ConduitConfig) -> String {
    args.log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| config.logging.level.directive().to_owned())
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("warning: bad log filter '{directive}': {e}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&log_directive(&args, &config));
    tracing::debug!("conduit v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(config = %conduit_config::config_to_json(&config), "effective config");

    match commands::run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
