//! Derived subscriptions: `then`, `map`, `catch`, `finally`, `merge`.

use std::sync::Arc;

use super::{Emitter, Subscription};

impl<T, E> Subscription<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Derive a subscription whose emissions pass through `on_ok` and `on_err`.
    ///
    /// Either handler returning `Ok` fires the derived success channel and
    /// returning `Err` fires the derived error channel, once per upstream
    /// emission. Cancelling the derived subscription cancels this one.
    pub fn then<U, F, G>(&self, on_ok: F, on_err: G) -> Subscription<U, E>
    where
        U: Clone + Send + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
        G: Fn(E) -> Result<U, E> + Send + Sync + 'static,
    {
        let upstream_ok = self.success.clone();
        let upstream_err = self.error.clone();
        let upstream = self.cancel_handle();

        Subscription::new(move |emitter: Emitter<U, E>| {
            let em = emitter.clone();
            let ok_rx = upstream_ok.receive_fn(move |value| em.settle(on_ok(value)));
            let em = emitter.clone();
            let err_rx = upstream_err.receive_fn(move |error| em.settle(on_err(error)));

            emitter.on_cancel(move || {
                upstream_ok.remove(&ok_rx);
                upstream_err.remove(&err_rx);
                upstream.cancel();
            });
        })
    }

    /// `then` with pass-through errors.
    pub fn map<U, F>(&self, f: F) -> Subscription<U, E>
    where
        U: Clone + Send + 'static,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        self.then(f, Err)
    }

    /// `then` with pass-through successes; `on_err` may recover with `Ok`.
    pub fn catch<G>(&self, on_err: G) -> Subscription<T, E>
    where
        G: Fn(E) -> Result<T, E> + Send + Sync + 'static,
    {
        self.then(Ok, on_err)
    }

    /// Call `on_done` for every emission, then re-emit it unchanged.
    pub fn finally<F>(&self, on_done: F) -> Subscription<T, E>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let on_done = Arc::new(on_done);
        let on_err_done = Arc::clone(&on_done);
        self.then(
            move |value| {
                on_done();
                Ok(value)
            },
            move |error| {
                on_err_done();
                Err(error)
            },
        )
    }

    /// Forward every emission of every upstream. Cancelling the merged
    /// subscription cancels all of them.
    pub fn merge(upstreams: impl IntoIterator<Item = Subscription<T, E>>) -> Subscription<T, E> {
        let upstreams: Vec<Subscription<T, E>> = upstreams.into_iter().collect();

        Subscription::new(move |emitter: Emitter<T, E>| {
            let mut registrations = Vec::with_capacity(upstreams.len());
            for upstream in upstreams {
                let em = emitter.clone();
                let ok_rx = upstream.success.receive_fn(move |value| em.emit(value));
                let em = emitter.clone();
                let err_rx = upstream.error.receive_fn(move |error| em.fail(error));
                registrations.push((upstream, ok_rx, err_rx));
            }

            emitter.on_cancel(move || {
                for (upstream, ok_rx, err_rx) in registrations {
                    upstream.success.remove(&ok_rx);
                    upstream.error.remove(&err_rx);
                    upstream.cancel();
                }
            });
        })
    }
}
