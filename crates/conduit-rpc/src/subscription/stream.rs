//! Bridge from callback-driven subscriptions to async consumers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::Subscription;
use crate::pipe::Receiver;

/// Emissions of a subscription as `Result` items, in arrival order.
///
/// The stream does not end by itself. Dropping it cancels the
/// subscription it was built from.
pub struct SubscriptionStream<T, E> {
    rx: mpsc::UnboundedReceiver<Result<T, E>>,
    upstream: Subscription<T, E>,
    ok_rx: Receiver<T>,
    err_rx: Receiver<E>,
}

impl<T, E> fmt::Debug for SubscriptionStream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionStream")
            .field("upstream", &self.upstream)
            .finish()
    }
}

impl<T, E> Subscription<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn into_stream(self) -> SubscriptionStream<T, E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let ok_tx = tx.clone();
        let ok_rx = self.success.receive_fn(move |value| {
            let _ = ok_tx.send(Ok(value));
        });
        let err_rx = self.error.receive_fn(move |e| {
            let _ = tx.send(Err(e));
        });

        SubscriptionStream {
            rx,
            upstream: self,
            ok_rx,
            err_rx,
        }
    }

    /// Wait for the first emission, then cancel.
    ///
    /// The consumer is attached before this returns, so emissions made
    /// before the future is polled are not lost.
    pub fn first(self) -> impl Future<Output = Option<Result<T, E>>> + Send {
        let mut stream = self.into_stream();
        async move { stream.next().await }
    }
}

// Every field is a handle to shared state; nothing is pinned in place.
impl<T, E> Unpin for SubscriptionStream<T, E> {}

impl<T, E> Stream for SubscriptionStream<T, E> {
    type Item = Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T, E> Drop for SubscriptionStream<T, E> {
    fn drop(&mut self) {
        self.upstream.success.remove(&self.ok_rx);
        self.upstream.error.remove(&self.err_rx);
        self.upstream.cancel();
    }
}
