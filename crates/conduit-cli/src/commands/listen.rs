use conduit_common::{ConduitError, RpcError};
use conduit_config::ConduitConfig;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{info, warn};

pub(super) async fn run(
    config: &ConduitConfig,
    id: i64,
    count: Option<usize>,
) -> Result<(), ConduitError> {
    let client = conduit_transport::open_client(config).await?;
    let mut messages = client.subscribe_push(id)?.into_stream();
    info!(id, ?count, "listening");

    let mut seen = 0usize;
    let result = loop {
        if count.is_some_and(|limit| seen >= limit) {
            break Ok(());
        }
        let next = tokio::select! {
            next = messages.next() => next,
            _ = tokio::signal::ctrl_c() => break Ok(()),
        };
        let Some(item) = next else {
            break Ok(());
        };
        match render(item) {
            Ok(Some(line)) => {
                seen += 1;
                println!("{line}");
            }
            Ok(None) => {}
            Err(e) => break Err(e.into()),
        }
    };

    drop(messages);
    let _ = client.close();
    info!(id, received = seen, "stopped listening");
    result
}

/// One pushed outcome as an output line. Errors that leave the session
/// usable are logged and skipped; terminal ones stop the listener.
fn render(item: Result<Value, RpcError>) -> Result<Option<String>, RpcError> {
    match item {
        Ok(value) => Ok(Some(value.to_string())),
        Err(e) if !e.is_terminal() => {
            warn!(error = %e, "push channel reported an error");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
