//! Future handed out for one request or one-shot push wait.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use conduit_common::RpcError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;

pub(crate) type Outcome = Result<Value, RpcError>;

/// Resolves exactly once with the first message delivered under its id.
///
/// If the client drops the waiter without answering, the reply resolves
/// with [`RpcError::Closed`].
#[derive(Debug)]
pub struct Reply {
    id: i64,
    rx: oneshot::Receiver<Outcome>,
}

impl Reply {
    pub(crate) fn new(id: i64, rx: oneshot::Receiver<Outcome>) -> Self {
        Self { id, rx }
    }

    /// The id this reply is correlated by.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Await the result and deserialize it into `T`.
    pub async fn decode<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        let value = self.await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string()))
    }
}

impl Future for Reply {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RpcError::Closed)))
    }
}
