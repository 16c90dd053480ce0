//! Multi-subscriber fan-out with no buffering.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// A registered pipe consumer. Identity is the `Arc` allocation.
pub type Receiver<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Synchronous fan-out to every registered receiver.
///
/// Clones share the same receiver list.
pub struct Pipe<T> {
    receivers: Arc<Mutex<Vec<Receiver<T>>>>,
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Self {
            receivers: Arc::clone(&self.receivers),
        }
    }
}

impl<T> Default for Pipe<T> {
    fn default() -> Self {
        Self {
            receivers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("receivers", &self.receivers.lock().len())
            .finish()
    }
}

impl<T: Clone> Pipe<T> {
    /// Deliver `data` to every receiver in registration order.
    ///
    /// Iterates a snapshot, so receivers may add or remove receivers on
    /// this pipe while being called. With no receivers the data is dropped.
    pub fn send(&self, data: T) {
        let snapshot: Vec<Receiver<T>> = self.receivers.lock().clone();
        let Some((last, rest)) = snapshot.split_last() else {
            return;
        };
        for receiver in rest {
            receiver(data.clone());
        }
        last(data);
    }
}

impl<T> Pipe<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receive(&self, receiver: Receiver<T>) {
        self.receivers.lock().push(receiver);
    }

    /// Wrap `f` and register it, returning the handle needed to remove it.
    pub fn receive_fn(&self, f: impl Fn(T) + Send + Sync + 'static) -> Receiver<T> {
        let receiver: Receiver<T> = Arc::new(f);
        self.receive(Arc::clone(&receiver));
        receiver
    }

    /// Remove the first registration of `receiver`. Returns whether one was found.
    pub fn remove(&self, receiver: &Receiver<T>) -> bool {
        let mut receivers = self.receivers.lock();
        match receivers.iter().position(|r| Arc::ptr_eq(r, receiver)) {
            Some(index) => {
                receivers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.receivers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
