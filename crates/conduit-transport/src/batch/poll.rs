use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::BatchInner;

pub(super) async fn poll_task(inner: Arc<BatchInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; polls start one period in.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = inner.shutdown.cancelled() => break,
        }
        if !inner.exchange(inner.http.get(&inner.config.url)).await {
            break;
        }
    }
    debug!(session = %inner.session_token, "batch poll task stopped");
}
