//! One upstream registration shared by many independently cancellable consumers.

use std::fmt;

use super::{Emitter, Subscription};
use crate::pipe::Pipe;

/// Factory returned by [`Subscription::split_cancel`].
///
/// The upstream is subscribed exactly once, at construction. Each
/// [`SplitCancel::subscribe`] call attaches a new consumer to the shared
/// fan-out; cancelling that consumer detaches only it. The upstream stays
/// registered until [`SplitCancel::close`].
pub struct SplitCancel<T, E> {
    success: Pipe<T>,
    error: Pipe<E>,
    upstream: Subscription<T, E>,
}

impl<T, E> Clone for SplitCancel<T, E> {
    fn clone(&self) -> Self {
        Self {
            success: self.success.clone(),
            error: self.error.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

impl<T, E> fmt::Debug for SplitCancel<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitCancel")
            .field("consumers", &self.success.len())
            .field("upstream", &self.upstream)
            .finish()
    }
}

impl<T, E> SplitCancel<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new(upstream: Subscription<T, E>) -> Self {
        let success = Pipe::new();
        let error = Pipe::new();

        let fan_ok = success.clone();
        upstream.success.receive_fn(move |value| fan_ok.send(value));
        let fan_err = error.clone();
        upstream.error.receive_fn(move |e| fan_err.send(e));

        Self {
            success,
            error,
            upstream,
        }
    }

    /// A fresh consumer of the shared upstream.
    pub fn subscribe(&self) -> Subscription<T, E> {
        let success = self.success.clone();
        let error = self.error.clone();

        Subscription::new(move |emitter: Emitter<T, E>| {
            let em = emitter.clone();
            let ok_rx = success.receive_fn(move |value| em.emit(value));
            let em = emitter.clone();
            let err_rx = error.receive_fn(move |e| em.fail(e));

            emitter.on_cancel(move || {
                success.remove(&ok_rx);
                error.remove(&err_rx);
            });
        })
    }

    /// Number of consumers currently attached.
    pub fn consumers(&self) -> usize {
        self.success.len()
    }

    /// Cancel the shared upstream registration.
    pub fn close(&self) {
        self.upstream.cancel();
    }
}

impl<T, E> Subscription<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Share this subscription among consumers with independent cancellation.
    pub fn split_cancel(self) -> SplitCancel<T, E> {
        SplitCancel::new(self)
    }
}
