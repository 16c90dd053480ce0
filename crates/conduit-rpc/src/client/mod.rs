//! The correlation engine.
//!
//! One [`RpcClient`] multiplexes unary requests (non-negative ids, one
//! reply each) and push channels (negative ids, any number of messages)
//! over a single [`Transport`]. Callbacks never run while the slot table
//! is locked, so a consumer may call back into the client from inside a
//! delivery.

mod reply;
mod slots;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Weak};

use conduit_common::{ProtocolVersion, RpcError, TransportError};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::subscription::{Emitter, Subscription};
use crate::transport::Transport;
use crate::wire::{self, InboundMessage};

pub use reply::Reply;

use slots::{fan_out, Member, SlotTable, Target};

/// WebSocket "normal closure".
const NORMAL_CLOSURE: u16 = 1000;

/// JSON-RPC client bound to one transport at a time.
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    version: ProtocolVersion,
    state: Mutex<State>,
}

struct State {
    next_id: i64,
    next_token: u64,
    slots: SlotTable,
    closed: bool,
    conn: Option<Arc<dyn Transport>>,
    /// Bumped on every reconnect and on close; callbacks from an older
    /// attachment are ignored.
    generation: u64,
}

// ---------------------------------------------------------------------------
// Session API
// ---------------------------------------------------------------------------

impl RpcClient {
    pub fn new(conn: Arc<dyn Transport>, version: ProtocolVersion) -> Self {
        let inner = Arc::new(Inner {
            version,
            state: Mutex::new(State {
                next_id: 0,
                next_token: 0,
                slots: SlotTable::default(),
                closed: false,
                conn: Some(Arc::clone(&conn)),
                generation: 0,
            }),
        });
        attach(&inner, conn.as_ref(), 0);
        Self { inner }
    }

    /// Send one request and return a future for its reply.
    ///
    /// Fails synchronously only for a closed client or an exhausted id
    /// space. A transport send failure rejects the returned [`Reply`].
    pub fn request(&self, method: &str, params: Value) -> Result<Reply, RpcError> {
        let (tx, rx) = oneshot::channel();
        let (id, conn, frame) = {
            let mut state = self.inner.state.lock();
            let conn = match (&state.conn, state.closed) {
                (Some(conn), false) => Arc::clone(conn),
                _ => return Err(RpcError::Closed),
            };
            let id = state.next_id;
            let next = id
                .checked_add(1)
                .ok_or_else(|| RpcError::Usage("request id space exhausted".into()))?;
            let frame = wire::encode_request(self.inner.version, method, id, params)?;
            state.next_id = next;
            // Registered before sending so a loopback reply inside `send` finds it.
            state.slots.insert_pending(id, tx);
            (id, conn, frame)
        };

        debug!(id, method, "sending request");
        if let Err(e) = conn.send(frame) {
            warn!(id, method, error = %e, "request send failed");
            let pending = self.inner.state.lock().slots.take_pending(id);
            if let Some(tx) = pending {
                let _ = tx.send(Err(e.into()));
            }
        }
        Ok(Reply::new(id, rx))
    }

    /// Wait for the next message on push channel `id`.
    pub fn await_push(&self, id: i64) -> Result<Reply, RpcError> {
        check_push_id(id)?;
        let (tx, rx) = oneshot::channel();
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(RpcError::Closed);
        }
        state.slots.join(id, Member::Once(tx));
        Ok(Reply::new(id, rx))
    }

    /// Receive every message on push channel `id` until cancelled.
    ///
    /// Each subscriber on the same id sees every message. Cancelling
    /// detaches only this subscriber.
    pub fn subscribe_push(&self, id: i64) -> Result<Subscription<Value>, RpcError> {
        check_push_id(id)?;
        let mut registered = Err(RpcError::Closed);
        let subscription = Subscription::new(|emitter: Emitter<Value, RpcError>| {
            let token = {
                let mut state = self.inner.state.lock();
                if state.closed {
                    return;
                }
                let token = state.next_token;
                state.next_token += 1;
                let em = emitter.clone();
                state.slots.join(
                    id,
                    Member::Keep {
                        token,
                        deliver: Arc::new(move |outcome: reply::Outcome| em.settle(outcome)),
                    },
                );
                token
            };

            let weak: Weak<Inner> = Arc::downgrade(&self.inner);
            emitter.on_cancel(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().slots.leave(id, token);
                    debug!(id, token, "push subscriber left");
                }
            });
            registered = Ok(());
        });
        registered.map(|()| subscription)
    }

    /// Route one raw inbound message. Anything unusable is dropped.
    pub fn handle_message(&self, raw: &str) {
        self.inner.dispatch(raw);
    }

    /// Fail everything outstanding with `error` and close the session.
    pub fn handle_error(&self, error: TransportError) -> Result<(), RpcError> {
        warn!(error = %error, "transport failed");
        self.inner.shutdown(RpcError::Transport(error), false)
    }

    /// Close the session and its transport. Every pending request and
    /// push subscriber receives [`RpcError::Closed`].
    pub fn close(&self) -> Result<(), RpcError> {
        self.inner.shutdown(RpcError::Closed, true)
    }

    /// Move the session onto a new transport.
    ///
    /// The id counter and push channels carry over. Requests still in
    /// flight fail with [`TransportError::ConnectionReplaced`]; the old
    /// transport is detached and closed. Passing the transport that is
    /// already attached changes nothing.
    pub fn reconnect(&self, conn: Arc<dyn Transport>) -> Result<(), RpcError> {
        let (old, in_flight, generation) = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(RpcError::Closed);
            }
            if state.conn.as_ref().is_some_and(|current| Arc::ptr_eq(current, &conn)) {
                debug!("reconnect onto the attached transport ignored");
                return Ok(());
            }
            state.generation += 1;
            let old = state.conn.replace(Arc::clone(&conn));
            (old, state.slots.drain_pending(), state.generation)
        };

        attach(&self.inner, conn.as_ref(), generation);
        if let Some(old) = old {
            old.close(Some(NORMAL_CLOSURE), Some("reconnect"));
        }
        info!(generation, failed = in_flight.len(), "transport replaced");
        fan_out(in_flight, Err(TransportError::ConnectionReplaced.into()));
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of live pending requests and push channels.
    pub fn outstanding(&self) -> usize {
        self.inner.state.lock().slots.len()
    }

    pub fn version(&self) -> ProtocolVersion {
        self.inner.version
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RpcClient")
            .field("version", &self.inner.version)
            .field("next_id", &state.next_id)
            .field("outstanding", &state.slots.len())
            .field("closed", &state.closed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        !state.closed && state.generation == generation
    }

    fn dispatch(&self, raw: &str) {
        let message = match InboundMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "dropping unparsable message");
                return;
            }
        };
        let Some(id) = message.id() else {
            debug!(id = %message.id, "dropping message without a usable id");
            return;
        };
        let targets = self.state.lock().slots.targets(id);
        let Some(targets) = targets else {
            debug!(id, "dropping message for unknown id");
            return;
        };
        debug!(id, consumers = targets.len(), "dispatching message");
        fan_out(targets, message.outcome().map_err(RpcError::from));
    }

    fn shutdown(&self, error: RpcError, close_transport: bool) -> Result<(), RpcError> {
        let (targets, conn): (Vec<Target>, _) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RpcError::Closed);
            }
            state.closed = true;
            state.generation += 1;
            (state.slots.drain(), state.conn.take())
        };

        if close_transport {
            if let Some(conn) = conn {
                conn.close(Some(NORMAL_CLOSURE), None);
            }
        }
        info!(failed = targets.len(), reason = %error, "session closed");
        fan_out(targets, Err(error));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_push_id(id: i64) -> Result<(), RpcError> {
    if id >= 0 {
        return Err(RpcError::Usage(format!(
            "push channel ids are negative, got {id}"
        )));
    }
    Ok(())
}

/// Point `conn`'s callbacks at `inner` for attachment `generation`.
fn attach(inner: &Arc<Inner>, conn: &dyn Transport, generation: u64) {
    let weak = Arc::downgrade(inner);
    let on_message = Arc::new(move |raw: String| {
        if let Some(inner) = weak.upgrade() {
            if inner.is_current(generation) {
                inner.dispatch(&raw);
            }
        }
    });

    let weak = Arc::downgrade(inner);
    let on_error = Arc::new(move |error: TransportError| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if !inner.is_current(generation) {
            debug!(generation, error = %error, "ignoring error from detached transport");
            return;
        }
        warn!(error = %error, "transport failed");
        let _ = inner.shutdown(RpcError::Transport(error), false);
    });

    conn.when(on_message, on_error);
}
