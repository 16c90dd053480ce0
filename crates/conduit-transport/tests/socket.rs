//! Socket adapter against an in-process WebSocket server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use conduit_common::{ProtocolVersion, RpcError, TransportError};
use conduit_config::SocketConfig;
use conduit_rpc::{RpcClient, Transport};
use conduit_transport::SocketTransport;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

/// Accept one connection and hand it to `handler`. Returns the config to reach it.
async fn serve_once<F, Fut>(handler: F) -> SocketConfig
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    SocketConfig {
        url: format!("ws://{addr}/rpc"),
        connect_timeout_secs: 5,
    }
}

/// Answer every request with its own params as the result.
async fn echo(mut ws: WebSocketStream<TcpStream>) {
    while let Some(Ok(msg)) = ws.next().await {
        let Message::Text(text) = msg else { continue };
        let request: Value = serde_json::from_str(text.as_str()).unwrap();
        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": request["params"]});
        if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}

type Events = (
    mpsc::UnboundedReceiver<String>,
    mpsc::UnboundedReceiver<TransportError>,
);

fn watch(conn: &SocketTransport) -> Events {
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let (err_tx, err_rx) = mpsc::unbounded_channel();
    conn.when(
        Arc::new(move |raw: String| {
            let _ = msg_tx.send(raw);
        }),
        Arc::new(move |err: TransportError| {
            let _ = err_tx.send(err);
        }),
    );
    (msg_rx, err_rx)
}

#[tokio::test]
async fn request_round_trip() {
    let config = serve_once(echo).await;
    let conn = SocketTransport::connect(&config).await.unwrap();
    let client = RpcClient::new(Arc::new(conn), ProtocolVersion::V2);

    let first = client.request("echo", json!({"n": 1})).unwrap();
    let second = client.request("echo", json!("two")).unwrap();

    let first = tokio::time::timeout(WAIT, first).await.unwrap();
    let second = tokio::time::timeout(WAIT, second).await.unwrap();
    assert_eq!(first, Ok(json!({"n": 1})));
    assert_eq!(second, Ok(json!("two")));
    client.close().unwrap();
}

#[tokio::test]
async fn peer_close_is_reported_once() {
    let config = serve_once(|mut ws| async move {
        let _ = ws.next().await;
        let _ = ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Away,
                reason: "bye".to_owned().into(),
            })))
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
    })
    .await;

    let conn = SocketTransport::connect(&config).await.unwrap();
    let (_msgs, mut errors) = watch(&conn);
    conn.send("{}".into()).unwrap();

    let err = tokio::time::timeout(WAIT, errors.recv()).await.unwrap();
    assert_eq!(
        err,
        Some(TransportError::PeerClosed {
            code: 1001,
            reason: "bye".into(),
        })
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(errors.try_recv().is_err());
    assert_eq!(conn.send("{}".into()), Err(TransportError::Closed));
}

#[tokio::test]
async fn peer_close_fails_pending_requests() {
    let config = serve_once(|mut ws| async move {
        let _ = ws.next().await;
        let _ = ws.close(None).await;
    })
    .await;

    let conn = SocketTransport::connect(&config).await.unwrap();
    let client = RpcClient::new(Arc::new(conn), ProtocolVersion::V2);
    let reply = client.request("never", json!({})).unwrap();

    let outcome = tokio::time::timeout(WAIT, reply).await.unwrap();
    assert!(
        matches!(outcome, Err(RpcError::Transport(TransportError::PeerClosed { .. }))),
        "{outcome:?}"
    );
    assert!(client.is_closed());
}

#[tokio::test]
async fn local_close_reports_nothing() {
    let config = serve_once(echo).await;
    let conn = SocketTransport::connect(&config).await.unwrap();
    let (_msgs, mut errors) = watch(&conn);

    conn.close(Some(1000), Some("done"));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(errors.try_recv().is_err());
    assert_eq!(conn.send("{}".into()), Err(TransportError::Closed));
}

#[tokio::test]
async fn messages_wait_for_a_handler() {
    let config = serve_once(|mut ws| async move {
        for n in 0..3 {
            let push = json!({"id": -1, "result": n}).to_string();
            ws.send(Message::Text(push.into())).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    })
    .await;

    let conn = SocketTransport::connect(&config).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let (mut msgs, _errors) = watch(&conn);

    for n in 0..3 {
        let raw = tokio::time::timeout(WAIT, msgs.recv()).await.unwrap().unwrap();
        let push: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(push["result"], n);
    }
}

#[tokio::test]
async fn push_channel_over_socket() {
    let config = serve_once(|mut ws| async move {
        let _ = ws.next().await;
        for tick in ["a", "b"] {
            let push = json!({"id": -5, "result": tick}).to_string();
            ws.send(Message::Text(push.into())).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    })
    .await;

    let conn = SocketTransport::connect(&config).await.unwrap();
    let client = RpcClient::new(Arc::new(conn), ProtocolVersion::V2);
    let mut ticks = client.subscribe_push(-5).unwrap().into_stream();
    let _ = client.request("subscribe", json!({})).unwrap();

    for expected in ["a", "b"] {
        let tick = tokio::time::timeout(WAIT, ticks.next()).await.unwrap();
        assert_eq!(tick, Some(Ok(json!(expected))));
    }
}

#[tokio::test]
async fn dropping_the_last_handle_releases_the_connection() {
    let (ended_tx, ended_rx) = oneshot::channel();
    let config = serve_once(|mut ws| async move {
        while let Some(Ok(_)) = ws.next().await {}
        let _ = ended_tx.send(());
    })
    .await;

    let conn = SocketTransport::connect(&config).await.unwrap();
    let client = RpcClient::new(Arc::new(conn), ProtocolVersion::V2);
    let _ = client.request("hello", json!({})).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(client);

    tokio::time::timeout(WAIT, ended_rx).await.unwrap().unwrap();
}
