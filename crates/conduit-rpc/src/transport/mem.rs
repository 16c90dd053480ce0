use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use conduit_common::TransportError;
use parking_lot::Mutex;

use super::{ErrorHandler, MessageHandler, Transport};

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// In-process transport: records what is sent and lets the caller inject
/// inbound traffic.
///
/// With a responder installed, every sent frame is offered to it and any
/// reply is delivered back synchronously, from inside `send`.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemInner>,
}

#[derive(Default)]
struct MemInner {
    sent: Mutex<Vec<String>>,
    handlers: Mutex<Option<(MessageHandler, ErrorHandler)>>,
    responder: Mutex<Option<Responder>>,
    closed: AtomicBool,
    close_frame: Mutex<Option<(Option<u16>, Option<String>)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(
        responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        let transport = Self::new();
        *transport.inner.responder.lock() = Some(Arc::new(responder));
        transport
    }

    /// Frames handed to `send`, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.inner.sent.lock().clone()
    }

    /// Feed one inbound message to the registered handler.
    pub fn deliver(&self, raw: impl Into<String>) {
        if let Some((on_message, _)) = self.handlers() {
            on_message(raw.into());
        }
    }

    /// Report a terminal failure to the registered handler.
    pub fn fail(&self, error: TransportError) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some((_, on_error)) = self.handlers() {
            on_error(error);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Code and reason of the local close, if `close` was called.
    pub fn close_frame(&self) -> Option<(Option<u16>, Option<String>)> {
        self.inner.close_frame.lock().clone()
    }

    fn handlers(&self) -> Option<(MessageHandler, ErrorHandler)> {
        self.inner.handlers.lock().clone()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let responder = self.inner.responder.lock().clone();
        let reply = responder.and_then(|respond| respond(&frame));
        self.inner.sent.lock().push(frame);
        if let Some(reply) = reply {
            self.deliver(reply);
        }
        Ok(())
    }

    fn close(&self, code: Option<u16>, reason: Option<&str>) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.inner.close_frame.lock() = Some((code, reason.map(str::to_owned)));
    }

    fn when(&self, on_message: MessageHandler, on_error: ErrorHandler) {
        *self.inner.handlers.lock() = Some((on_message, on_error));
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("sent", &self.inner.sent.lock().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
