use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tracing::debug;

use super::BatchInner;

/// Coalesce queued frames into one POST per tick or debounce window.
///
/// Frames still queued when the transport shuts down are discarded.
pub(super) async fn flush_task(inner: Arc<BatchInner>, mut rx: mpsc::UnboundedReceiver<String>) {
    loop {
        let first = tokio::select! {
            first = rx.recv() => first,
            _ = inner.shutdown.cancelled() => break,
        };
        let Some(mut body) = first else {
            break;
        };

        let debounce = inner.config.debounce();
        if debounce.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {}
                _ = inner.shutdown.cancelled() => break,
            }
        }

        let mut frames = 1;
        while let Ok(frame) = rx.try_recv() {
            body.push_str(&frame);
            frames += 1;
        }
        if inner.is_finished() {
            break;
        }

        debug!(frames, bytes = body.len(), "flushing batch");
        let request = inner
            .http
            .post(&inner.config.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if !inner.exchange(request).await {
            break;
        }
    }
    debug!(session = %inner.session_token, "batch flush task stopped");
}
