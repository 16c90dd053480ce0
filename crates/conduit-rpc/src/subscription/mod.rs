//! Cancellable, chainable, multi-fire notification channels.
//!
//! A [`Subscription`] has a success channel and an error channel, each of
//! which may fire any number of times, plus a cancellation capability.
//! Emission flows parent → child through [`Pipe`]s; cancellation flows
//! child → parent through [`CancelHandle`]s. A child never owns its
//! parent's consumers, so chains do not form reference cycles.

mod combinators;
mod split;
mod stream;


use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use conduit_common::RpcError;
use parking_lot::Mutex;

use crate::pipe::Pipe;

pub use split::SplitCancel;
pub use stream::SubscriptionStream;

type Canceller = Box<dyn FnOnce() + Send>;

/// Shared cancellation switch of one subscription.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    cancellers: Arc<Mutex<Vec<Canceller>>>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            cancellers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run every registered canceller once. Later calls do nothing.
    pub fn cancel(&self) {
        let cancellers = {
            let mut cancellers = self.cancellers.lock();
            if self.cancelled.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *cancellers)
        };
        for canceller in cancellers {
            canceller();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// The producer side handed to a subscription's setup routine.
pub struct Emitter<T, E> {
    success: Pipe<T>,
    error: Pipe<E>,
    cancelled: Arc<AtomicBool>,
    // Weak: cancellers usually capture an emitter, a strong ref would cycle.
    cancellers: Weak<Mutex<Vec<Canceller>>>,
}

impl<T, E> Clone for Emitter<T, E> {
    fn clone(&self) -> Self {
        Self {
            success: self.success.clone(),
            error: self.error.clone(),
            cancelled: Arc::clone(&self.cancelled),
            cancellers: Weak::clone(&self.cancellers),
        }
    }
}

impl<T: Clone, E: Clone> Emitter<T, E> {
    /// Fire the success channel. Ignored once cancelled.
    pub fn emit(&self, value: T) {
        if !self.is_cancelled() {
            self.success.send(value);
        }
    }

    /// Fire the error channel. Ignored once cancelled.
    pub fn fail(&self, error: E) {
        if !self.is_cancelled() {
            self.error.send(error);
        }
    }

    /// Route `Ok` to the success channel and `Err` to the error channel.
    pub fn settle(&self, outcome: Result<T, E>) {
        match outcome {
            Ok(value) => self.emit(value),
            Err(error) => self.fail(error),
        }
    }
}

impl<T, E> Emitter<T, E> {
    /// Register what cancelling this subscription does upstream.
    ///
    /// Runs `f` immediately if the subscription is already cancelled.
    pub fn on_cancel(&self, f: impl FnOnce() + Send + 'static) {
        let Some(cancellers) = self.cancellers.upgrade() else {
            // Every handle is gone, so nothing can cancel any more.
            return;
        };
        let mut list = cancellers.lock();
        if self.cancelled.load(Ordering::SeqCst) {
            drop(list);
            f();
        } else {
            list.push(Box::new(f));
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A cold, externally driven stream of successes and errors.
///
/// Nothing is buffered: emissions with no consumer attached are lost.
/// Dropping a handle does not cancel; call [`Subscription::cancel`].
pub struct Subscription<T, E = RpcError> {
    pub(crate) success: Pipe<T>,
    pub(crate) error: Pipe<E>,
    handle: CancelHandle,
}

impl<T, E> Clone for Subscription<T, E> {
    fn clone(&self) -> Self {
        Self {
            success: self.success.clone(),
            error: self.error.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Subscription<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("consumers", &(self.success.len() + self.error.len()))
            .field("cancelled", &self.handle.is_cancelled())
            .finish()
    }
}

impl<T, E> Subscription<T, E> {
    /// Build a subscription; `setup` runs immediately and decides when
    /// each channel fires and what cancellation does upstream.
    pub fn new(setup: impl FnOnce(Emitter<T, E>)) -> Self {
        let success = Pipe::new();
        let error = Pipe::new();
        let handle = CancelHandle::new();
        let emitter = Emitter {
            success: success.clone(),
            error: error.clone(),
            cancelled: Arc::clone(&handle.cancelled),
            cancellers: Arc::downgrade(&handle.cancellers),
        };
        setup(emitter);
        Self {
            success,
            error,
            handle,
        }
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }
}
