use conduit_common::ConduitError;
use conduit_config::ConduitConfig;
use serde_json::Value;
use tracing::info;

pub(super) async fn run(
    config: &ConduitConfig,
    method: &str,
    params: Option<&str>,
) -> Result<(), ConduitError> {
    let params = parse_params(params)?;
    let client = conduit_transport::open_client(config).await?;
    let reply = client.request(method, params)?;
    info!(id = reply.id(), method, "request sent");

    let outcome = tokio::select! {
        outcome = reply => outcome,
        _ = tokio::signal::ctrl_c() => {
            let _ = client.close();
            return Err(ConduitError::Other("interrupted".into()));
        }
    };
    let _ = client.close();

    let result = outcome?;
    let pretty =
        serde_json::to_string_pretty(&result).map_err(|e| ConduitError::Json(e.to_string()))?;
    println!("{pretty}");
    Ok(())
}

fn parse_params(params: Option<&str>) -> Result<Value, ConduitError> {
    match params {
        None => Ok(Value::Null),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| ConduitError::Json(format!("invalid params: {e}"))),
    }
}
