//! HTTP batch/poll transport.
//!
//! Outgoing frames are queued and flushed as one POST per scheduling tick
//! (or per debounce window). Inbound messages arrive in POST response
//! bodies and, when polling is enabled, in periodic GET responses. Every
//! request carries the session token as a query parameter so the peer can
//! tie them to one logical session.

mod flush;
mod poll;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use conduit_common::{new_session_token, TransportError};
use conduit_config::BatchConfig;
use conduit_rpc::{ErrorHandler, MessageHandler, Transport};
use parking_lot::Mutex;
use reqwest::RequestBuilder;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::split::split;

/// A [`Transport`] over batched HTTP requests.
///
/// Background tasks start when handlers are first registered, so nothing
/// is fetched before there is somewhere to deliver it. They stop on
/// [`Transport::close`], on a terminal failure, or when the last clone of
/// the transport is dropped.
#[derive(Clone)]
pub struct BatchTransport {
    inner: Arc<BatchInner>,
    _stop_on_drop: Arc<DropGuard>,
}

pub(crate) struct BatchInner {
    config: BatchConfig,
    session_token: String,
    http: reqwest::Client,
    runtime: Handle,
    queue: mpsc::UnboundedSender<String>,
    pending_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    handlers: Mutex<Option<(MessageHandler, ErrorHandler)>>,
    finished: AtomicBool,
    shutdown: CancellationToken,
}

impl BatchTransport {
    /// Build a transport for `config` with a fresh session token.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(config: &BatchConfig) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::Connect(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let session_token = new_session_token();
        info!(url = %config.url, session = %session_token, "batch transport ready");

        let shutdown = CancellationToken::new();
        Ok(Self {
            _stop_on_drop: Arc::new(shutdown.clone().drop_guard()),
            inner: Arc::new(BatchInner {
                config: config.clone(),
                session_token,
                http,
                runtime,
                queue: tx,
                pending_rx: Mutex::new(Some(rx)),
                handlers: Mutex::new(None),
                finished: AtomicBool::new(false),
                shutdown,
            }),
        })
    }

    /// The random token sent with every request of this session.
    pub fn session_token(&self) -> &str {
        &self.inner.session_token
    }

    fn start(&self) {
        let Some(rx) = self.inner.pending_rx.lock().take() else {
            return;
        };
        self.inner
            .runtime
            .spawn(flush::flush_task(Arc::clone(&self.inner), rx));
        if let Some(period) = self.inner.config.poll_interval() {
            self.inner
                .runtime
                .spawn(poll::poll_task(Arc::clone(&self.inner), period));
        }
    }
}

impl Transport for BatchTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.inner.finished.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.inner
            .queue
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self, code: Option<u16>, _reason: Option<&str>) {
        if self.inner.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session = %self.inner.session_token, ?code, "closing batch transport");
        self.inner.shutdown.cancel();
    }

    fn when(&self, on_message: MessageHandler, on_error: ErrorHandler) {
        *self.inner.handlers.lock() = Some((on_message, on_error));
        self.start();
    }
}

impl std::fmt::Debug for BatchTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTransport")
            .field("url", &self.inner.config.url)
            .field("session", &self.inner.session_token)
            .field("finished", &self.inner.finished.load(Ordering::SeqCst))
            .finish()
    }
}

impl BatchInner {
    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        request.query(&[(
            self.config.session_param.as_str(),
            self.session_token.as_str(),
        )])
    }

    /// Run one HTTP exchange and deliver every value in the response body.
    /// Returns false once the transport is finished.
    pub(crate) async fn exchange(&self, request: RequestBuilder) -> bool {
        let request = self.with_session(request);
        let sent = tokio::select! {
            sent = request.send() => sent,
            _ = self.shutdown.cancelled() => return false,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                self.terminate(TransportError::Request(e.to_string()));
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.terminate(TransportError::Http(status.as_u16()));
            return false;
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                self.terminate(TransportError::Request(e.to_string()));
                return false;
            }
        };

        match split(&body) {
            Ok(values) => {
                debug!(values = values.len(), "batch response received");
                for value in values {
                    if self.is_finished() {
                        return false;
                    }
                    self.deliver(value.to_owned());
                }
                !self.is_finished()
            }
            Err(e) => {
                self.terminate(e.into());
                false
            }
        }
    }

    fn deliver(&self, raw: String) {
        let on_message = self.handlers.lock().clone().map(|(on_message, _)| on_message);
        if let Some(on_message) = on_message {
            on_message(raw);
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn terminate(&self, err: TransportError) {
        self.shutdown.cancel();
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!(session = %self.session_token, error = %err, "batch transport failed");
        let on_error = self.handlers.lock().clone().map(|(_, on_error)| on_error);
        if let Some(on_error) = on_error {
            on_error(err);
        }
    }
}
