//! WebSocket transport: one text frame per message.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use conduit_common::{new_correlation_id, TransportError};
use conduit_config::SocketConfig;
use conduit_rpc::{ErrorHandler, MessageHandler, Transport};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

/// Close code reported when the peer closes without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

enum Outgoing {
    Frame(String),
    Close(Option<CloseFrame>),
}

/// A [`Transport`] over one WebSocket connection.
///
/// A writer task drains queued frames into the socket and a reader task
/// feeds inbound text frames to the registered message handler. Any
/// failure or peer-initiated close is reported once through the error
/// handler; a local [`Transport::close`] reports nothing. Dropping the
/// last clone stops both tasks and releases the connection.
#[derive(Clone)]
pub struct SocketTransport {
    inner: Arc<SocketInner>,
    _stop_on_drop: Arc<DropGuard>,
}

struct SocketInner {
    conn_id: String,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    handlers: Mutex<Option<(MessageHandler, ErrorHandler)>>,
    attached: Notify,
    /// Set once the connection is over, locally or not.
    finished: AtomicBool,
    shutdown: CancellationToken,
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

impl SocketTransport {
    /// Open a connection, giving up after `connect_timeout_secs`.
    pub async fn connect(config: &SocketConfig) -> Result<Self, TransportError> {
        let timeout_secs = u64::from(config.connect_timeout_secs);
        info!(url = %config.url, "connecting websocket transport");

        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio_tungstenite::connect_async(config.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _response))) => Ok(Self::from_stream(ws_stream)),
            Ok(Err(e)) => {
                error!(url = %config.url, error = %e, "websocket connect failed");
                Err(TransportError::Connect(e.to_string()))
            }
            Err(_elapsed) => {
                error!(url = %config.url, timeout_secs, "websocket connect timed out");
                Err(TransportError::ConnectTimeout(timeout_secs))
            }
        }
    }

    /// Wrap an already established WebSocket. Spawns the reader and writer
    /// tasks, so it must run inside a tokio runtime.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let stop_on_drop = Arc::new(shutdown.clone().drop_guard());
        let inner = Arc::new(SocketInner {
            conn_id: new_correlation_id(),
            outgoing: tx,
            handlers: Mutex::new(None),
            attached: Notify::new(),
            finished: AtomicBool::new(false),
            shutdown,
        });

        let (ws_write, ws_read) = ws_stream.split();
        tokio::spawn(writer_task(ws_write, rx, Arc::clone(&inner)));
        tokio::spawn(reader_task(ws_read, Arc::clone(&inner)));
        debug!(conn = %inner.conn_id, "websocket transport started");

        Self {
            inner,
            _stop_on_drop: stop_on_drop,
        }
    }
}

// ---------------------------------------------------------------------------
// Transport Impl
// ---------------------------------------------------------------------------

impl Transport for SocketTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        if self.inner.finished.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.inner
            .outgoing
            .send(Outgoing::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self, code: Option<u16>, reason: Option<&str>) {
        if self.inner.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(conn = %self.inner.conn_id, ?code, "closing websocket transport");
        let frame = code.map(|code| CloseFrame {
            code: CloseCode::from(code),
            reason: reason.unwrap_or_default().to_owned().into(),
        });
        if self.inner.outgoing.send(Outgoing::Close(frame)).is_err() {
            self.inner.shutdown.cancel();
        }
    }

    fn when(&self, on_message: MessageHandler, on_error: ErrorHandler) {
        *self.inner.handlers.lock() = Some((on_message, on_error));
        self.inner.attached.notify_one();
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("conn", &self.inner.conn_id)
            .field("finished", &self.inner.finished.load(Ordering::SeqCst))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Inbound Delivery
// ---------------------------------------------------------------------------

impl SocketInner {
    /// Hand one inbound message to the current handler, waiting for one
    /// to be registered if needed.
    async fn deliver(&self, text: String) {
        let on_message = loop {
            let current = self.handlers.lock().clone();
            if let Some((on_message, _)) = current {
                break on_message;
            }
            tokio::select! {
                _ = self.attached.notified() => {}
                _ = self.shutdown.cancelled() => return,
            }
        };
        on_message(text);
    }

    /// Report the end of the connection, unless it was closed locally or
    /// already reported.
    fn terminate(&self, err: TransportError) {
        self.shutdown.cancel();
        if self.finished.swap(true, Ordering::SeqCst) {
            debug!(conn = %self.conn_id, error = %err, "websocket ended after close");
            return;
        }
        warn!(conn = %self.conn_id, error = %err, "websocket transport failed");
        let on_error = self.handlers.lock().clone().map(|(_, on_error)| on_error);
        if let Some(on_error) = on_error {
            on_error(err);
        }
    }
}

// ---------------------------------------------------------------------------
// Writer Task
// ---------------------------------------------------------------------------

async fn writer_task<S>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    inner: Arc<SocketInner>,
) where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    loop {
        let outgoing = tokio::select! {
            outgoing = rx.recv() => outgoing,
            _ = inner.shutdown.cancelled() => break,
        };
        match outgoing {
            Some(Outgoing::Frame(text)) => {
                if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                    inner.terminate(TransportError::Send(e.to_string()));
                    break;
                }
            }
            Some(Outgoing::Close(frame)) => {
                let _ = sink.send(WsMessage::Close(frame)).await;
                let _ = sink.close().await;
                inner.shutdown.cancel();
                break;
            }
            None => break,
        }
    }
    debug!(conn = %inner.conn_id, "websocket writer stopped");
}

// ---------------------------------------------------------------------------
// Reader Task
// ---------------------------------------------------------------------------

async fn reader_task<S>(mut stream: S, inner: Arc<SocketInner>)
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let err = loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = inner.shutdown.cancelled() => {
                debug!(conn = %inner.conn_id, "websocket reader stopped");
                return;
            }
        };
        match next {
            Some(Ok(WsMessage::Text(text))) => inner.deliver(text.as_str().to_owned()).await,
            Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => inner.deliver(text).await,
                Err(_) => debug!(conn = %inner.conn_id, "dropping non-UTF-8 binary frame"),
            },
            Some(Ok(WsMessage::Close(frame))) => {
                break match frame {
                    Some(frame) => TransportError::PeerClosed {
                        code: u16::from(frame.code),
                        reason: frame.reason.as_str().to_owned(),
                    },
                    None => TransportError::PeerClosed {
                        code: NO_STATUS_RECEIVED,
                        reason: String::new(),
                    },
                };
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => break TransportError::Lost(e.to_string()),
            None => break TransportError::Lost("stream ended".into()),
        }
    };
    inner.terminate(err);
}
