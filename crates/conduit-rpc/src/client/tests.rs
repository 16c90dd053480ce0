use std::sync::Arc;

use conduit_common::{ProtocolVersion, RpcError, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::RpcClient;
use crate::subscription::Subscription;
use crate::transport::{MemoryTransport, Transport};

type Log = Arc<Mutex<Vec<Result<Value, RpcError>>>>;

fn client(version: ProtocolVersion) -> (MemoryTransport, RpcClient) {
    let conn = MemoryTransport::new();
    let client = RpcClient::new(Arc::new(conn.clone()), version);
    (conn, client)
}

fn sent_frames(conn: &MemoryTransport) -> Vec<Value> {
    conn.sent()
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect()
}

fn collect(sub: &Subscription<Value>) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let ok = Arc::clone(&log);
    sub.success.receive_fn(move |v| ok.lock().push(Ok(v)));
    let err = Arc::clone(&log);
    sub.error.receive_fn(move |e| err.lock().push(Err(e)));
    log
}

#[tokio::test]
async fn ping_pong_and_protocol_error() {
    let (conn, client) = client(ProtocolVersion::V2);
    let first = client.request("ping", json!({"n": 1})).unwrap();
    let second = client.request("ping", json!({"n": 1})).unwrap();

    assert_eq!(
        conn.sent(),
        vec![
            r#"{"jsonrpc":"2.0","method":"ping","id":0,"params":{"n":1}}"#,
            r#"{"jsonrpc":"2.0","method":"ping","id":1,"params":{"n":1}}"#,
        ]
    );

    conn.deliver(r#"{"id":0,"result":"pong"}"#);
    conn.deliver(r#"{"id":1,"error":{"code":1,"message":"boom"}}"#);

    assert_eq!(first.await, Ok(json!("pong")));
    let err = second.await.unwrap_err();
    let protocol = err.as_protocol().expect("protocol error");
    assert_eq!(protocol.code(), 1);
    assert_eq!(protocol.message(), "boom");
    assert_eq!(client.outstanding(), 0);
}

#[test]
fn push_subscription_sees_messages_in_order() {
    let (conn, client) = client(ProtocolVersion::V2);
    let sub = client.subscribe_push(-5).unwrap();
    let log = collect(&sub);

    conn.deliver(r#"{"id":-5,"result":"a"}"#);
    conn.deliver(r#"{"id":-5,"result":"b"}"#);

    assert_eq!(*log.lock(), vec![Ok(json!("a")), Ok(json!("b"))]);
}

#[test]
fn ids_count_up_from_zero() {
    let (conn, client) = client(ProtocolVersion::V2);
    let ids: Vec<i64> = (0..5)
        .map(|_| client.request("tick", Value::Null).unwrap().id())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let wire_ids: Vec<i64> = sent_frames(&conn)
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();
    assert_eq!(wire_ids, ids);
}

#[test]
fn request_after_close_never_sends() {
    let (conn, client) = client(ProtocolVersion::V2);
    client.close().unwrap();
    assert_eq!(
        client.request("ping", json!({})).unwrap_err(),
        RpcError::Closed
    );
    assert!(conn.sent().is_empty());
}

#[test]
fn exhausted_id_space_is_usage_error() {
    let (conn, client) = client(ProtocolVersion::V2);
    client.inner.state.lock().next_id = i64::MAX;
    let err = client.request("ping", json!({})).unwrap_err();
    assert!(matches!(err, RpcError::Usage(_)));
    assert!(conn.sent().is_empty());
}

#[tokio::test]
async fn unusable_messages_are_dropped() {
    let (conn, client) = client(ProtocolVersion::V2);
    let reply = client.request("ping", json!({})).unwrap();

    client.handle_message("not json");
    client.handle_message("[1,2,3]");
    client.handle_message(r#"{"id":99,"result":1}"#);
    client.handle_message(r#"{"id":"zero","result":1}"#);
    client.handle_message(r#"{"id":0.5,"result":1}"#);
    client.handle_message(r#"{"method":"notify","params":[]}"#);
    assert_eq!(client.outstanding(), 1);

    conn.deliver(r#"{"id":"0","result":"late"}"#);
    assert_eq!(reply.await, Ok(json!("late")));
}

#[test]
fn push_ids_must_be_negative() {
    let (_conn, client) = client(ProtocolVersion::V2);
    assert!(matches!(client.await_push(0), Err(RpcError::Usage(_))));
    assert!(matches!(client.await_push(3), Err(RpcError::Usage(_))));
    assert!(matches!(client.subscribe_push(0), Err(RpcError::Usage(_))));
}

#[tokio::test]
async fn await_push_resolves_once_then_leaves() {
    let (conn, client) = client(ProtocolVersion::V2);
    let once = client.await_push(-1).unwrap();
    assert_eq!(client.outstanding(), 1);

    conn.deliver(r#"{"id":-1,"result":{"seq":1}}"#);
    assert_eq!(client.outstanding(), 0);
    conn.deliver(r#"{"id":-1,"result":{"seq":2}}"#);

    assert_eq!(once.await, Ok(json!({"seq": 1})));
}

#[test]
fn cancelled_push_subscriber_gets_nothing_more() {
    let (conn, client) = client(ProtocolVersion::V2);
    let sub = client.subscribe_push(-2).unwrap();
    let log = collect(&sub);

    for n in 0..3 {
        conn.deliver(format!(r#"{{"id":-2,"result":{n}}}"#));
    }
    sub.cancel();
    conn.deliver(r#"{"id":-2,"result":3}"#);

    assert_eq!(
        *log.lock(),
        vec![Ok(json!(0)), Ok(json!(1)), Ok(json!(2))]
    );
    assert_eq!(client.outstanding(), 0);
}

#[test]
fn push_fans_out_to_every_subscriber() {
    let (conn, client) = client(ProtocolVersion::V2);
    let a = client.subscribe_push(-3).unwrap();
    let b = client.subscribe_push(-3).unwrap();
    let log_a = collect(&a);
    let log_b = collect(&b);

    conn.deliver(r#"{"id":-3,"error":{"code":5,"message":"nope"}}"#);
    a.cancel();
    conn.deliver(r#"{"id":-3,"result":"x"}"#);

    assert_eq!(log_a.lock().len(), 1);
    assert!(matches!(&log_a.lock()[0], Err(RpcError::Protocol(e)) if e.code() == 5));
    assert_eq!(log_b.lock().len(), 2);
    assert_eq!(log_b.lock()[1], Ok(json!("x")));
    assert_eq!(client.outstanding(), 1);
}

#[tokio::test]
async fn close_fails_everything_exactly_once() {
    let (conn, client) = client(ProtocolVersion::V2);
    let reply = client.request("slow", json!({})).unwrap();
    let once = client.await_push(-1).unwrap();
    let sub = client.subscribe_push(-2).unwrap();
    let log = collect(&sub);

    client.close().unwrap();
    assert_eq!(client.close(), Err(RpcError::Closed));
    conn.deliver(r#"{"id":-2,"result":"after"}"#);

    assert_eq!(reply.await, Err(RpcError::Closed));
    assert_eq!(once.await, Err(RpcError::Closed));
    assert_eq!(*log.lock(), vec![Err(RpcError::Closed)]);
    assert_eq!(client.outstanding(), 0);
    assert!(client.is_closed());
    assert_eq!(conn.close_frame(), Some((Some(1000), None)));
}

#[test]
fn operations_after_close_are_closed_errors() {
    let (_conn, client) = client(ProtocolVersion::V2);
    client.close().unwrap();
    assert_eq!(client.await_push(-1).unwrap_err(), RpcError::Closed);
    assert_eq!(client.subscribe_push(-1).unwrap_err(), RpcError::Closed);
    assert_eq!(
        client.handle_error(TransportError::Lost("late".into())),
        Err(RpcError::Closed)
    );
}

#[tokio::test]
async fn transport_failure_is_broadcast() {
    let (conn, client) = client(ProtocolVersion::V2);
    let reply = client.request("ping", json!({})).unwrap();
    let sub = client.subscribe_push(-9).unwrap();
    let log = collect(&sub);

    conn.fail(TransportError::Lost("reset by peer".into()));
    conn.fail(TransportError::Lost("again".into()));

    let expected = RpcError::Transport(TransportError::Lost("reset by peer".into()));
    assert_eq!(reply.await, Err(expected.clone()));
    assert_eq!(*log.lock(), vec![Err(expected)]);
    assert!(client.is_closed());
}

#[tokio::test]
async fn send_failure_rejects_the_reply() {
    let (conn, client) = client(ProtocolVersion::V2);
    conn.close(None, None);

    let reply = client.request("ping", json!({})).unwrap();
    assert_eq!(
        reply.await,
        Err(RpcError::Transport(TransportError::Closed))
    );
    assert_eq!(client.outstanding(), 0);
    assert!(!client.is_closed());
}

#[tokio::test]
async fn loopback_reply_inside_send() {
    let conn = MemoryTransport::with_responder(|frame| {
        let request: Value = serde_json::from_str(frame).ok()?;
        let reply = json!({"id": request["id"], "result": request["params"]});
        Some(reply.to_string())
    });
    let client = RpcClient::new(Arc::new(conn.clone()), ProtocolVersion::V2);

    let reply = client.request("echo", json!([1, 2])).unwrap();
    assert_eq!(client.outstanding(), 0);
    assert_eq!(reply.await, Ok(json!([1, 2])));
}

#[tokio::test]
async fn callbacks_may_reenter_the_client() {
    let (conn, client) = client(ProtocolVersion::V2);
    let sub = client.subscribe_push(-4).unwrap();
    let replies = Arc::new(Mutex::new(Vec::new()));

    let reentrant = client.clone();
    let sink = Arc::clone(&replies);
    let handle = sub.cancel_handle();
    sub.success.receive_fn(move |v: Value| {
        sink.lock().push(reentrant.request("ack", v).unwrap());
        handle.cancel();
    });

    conn.deliver(r#"{"id":-4,"result":"hello"}"#);
    conn.deliver(r#"{"id":-4,"result":"ignored"}"#);

    let frames = sent_frames(&conn);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["method"], "ack");
    assert_eq!(frames[0]["params"], "hello");

    conn.deliver(r#"{"id":0,"result":true}"#);
    let reply = replies.lock().pop().unwrap();
    assert_eq!(reply.await, Ok(json!(true)));
}

#[tokio::test]
async fn a_subscriber_cancelled_mid_delivery_gets_nothing_more() {
    let (conn, client) = client(ProtocolVersion::V2);
    let first = client.subscribe_push(-6).unwrap();
    let second = client.subscribe_push(-6).unwrap();
    let second_log = collect(&second);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let other = second.cancel_handle();
    first.success.receive_fn(move |v: Value| {
        sink.lock().push(v);
        other.cancel();
    });

    conn.deliver(r#"{"id":-6,"result":1}"#);
    conn.deliver(r#"{"id":-6,"result":2}"#);

    assert_eq!(*seen.lock(), vec![json!(1), json!(2)]);
    assert!(second_log.lock().is_empty());
    assert!(second.is_cancelled());
}

#[tokio::test]
async fn reconnect_onto_the_same_transport_is_a_no_op() {
    let conn = MemoryTransport::new();
    let shared: Arc<dyn Transport> = Arc::new(conn.clone());
    let client = RpcClient::new(Arc::clone(&shared), ProtocolVersion::V2);
    let reply = client.request("slow", json!({})).unwrap();

    client.reconnect(shared).unwrap();

    assert!(!conn.is_closed());
    conn.deliver(r#"{"id":0,"result":"done"}"#);
    assert_eq!(reply.await, Ok(json!("done")));
    assert_eq!(client.request("next", json!({})).unwrap().id(), 1);
}

#[tokio::test]
async fn reconnect_fails_requests_but_keeps_channels() {
    let (old, client) = client(ProtocolVersion::V2);
    let in_flight = client.request("slow", json!({})).unwrap();
    let sub = client.subscribe_push(-7).unwrap();
    let log = collect(&sub);

    let new = MemoryTransport::new();
    client.reconnect(Arc::new(new.clone())).unwrap();

    assert_eq!(
        in_flight.await,
        Err(RpcError::Transport(TransportError::ConnectionReplaced))
    );
    assert!(old.is_closed());

    old.deliver(r#"{"id":-7,"result":"stale"}"#);
    new.deliver(r#"{"id":-7,"result":"fresh"}"#);
    assert_eq!(*log.lock(), vec![Ok(json!("fresh"))]);

    let next = client.request("ping", json!({})).unwrap();
    assert_eq!(next.id(), 1);
    assert_eq!(new.sent().len(), 1);
    assert!(!client.is_closed());
}

#[test]
fn reconnect_after_close_is_refused() {
    let (_conn, client) = client(ProtocolVersion::V2);
    client.close().unwrap();
    assert_eq!(
        client.reconnect(Arc::new(MemoryTransport::new())),
        Err(RpcError::Closed)
    );
}

#[test]
fn detached_transport_errors_are_ignored() {
    let (old, client) = client(ProtocolVersion::V2);
    client.reconnect(Arc::new(MemoryTransport::new())).unwrap();
    old.fail(TransportError::Lost("old socket".into()));
    assert!(!client.is_closed());
}

#[tokio::test]
async fn version_one_wraps_params_and_accepts_null_error() {
    let (conn, client) = client(ProtocolVersion::V1);
    assert_eq!(client.version(), ProtocolVersion::V1);
    let reply = client.request("add", json!({"a": 1})).unwrap();

    assert_eq!(
        sent_frames(&conn)[0],
        json!({"method": "add", "id": 0, "params": [{"a": 1}]})
    );
    conn.deliver(r#"{"id":0,"result":2,"error":null}"#);
    assert_eq!(reply.await, Ok(json!(2)));
}

#[test]
fn version_one_one_tags_frames() {
    let (conn, client) = client(ProtocolVersion::V1_1);
    client.request("add", json!(3)).unwrap();
    assert_eq!(
        sent_frames(&conn)[0],
        json!({"jsonrpc": "1.1", "method": "add", "id": 0, "params": [3]})
    );
}
