//! End-to-end tests for the socket transport: a real bridge server with a
//! mock runtime, driven by the socket client over TCP.

mod common;

use std::time::{Duration, Instant};

use freecad_bridge::bridge::{BridgeClient, ConnectionState};
use freecad_bridge::bridge::socket::SocketClient;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

fn client_for(addr: std::net::SocketAddr) -> SocketClient {
    SocketClient::new(
        addr.to_string(),
        Duration::from_secs(10),
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn test_handshake_and_ping() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());

    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let start = Instant::now();
    client.ping().await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_simple_execute() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();

    let envelope = client.execute("_result_ = 1 + 2", None).await.unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.result, Some(json!(3)));
    assert_eq!(envelope.stdout, "");
    assert_eq!(envelope.stderr, "");
    assert!(envelope.execution_time_ms >= 0.0);
    assert!(envelope.error_type.is_none());
}

#[tokio::test]
async fn test_script_error_envelope() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();

    let envelope = client
        .execute("raise ValueError('boom')", None)
        .await
        .unwrap();
    assert!(!envelope.success);
    assert_eq!(envelope.error_type.as_deref(), Some("ValueError"));
    assert!(envelope.error_message.as_deref().unwrap().contains("boom"));
    assert!(envelope
        .error_traceback
        .as_deref()
        .unwrap()
        .contains("<mcp>"));
    assert!(envelope.result.is_none());
}

#[tokio::test]
async fn test_timeout_envelope_within_grace() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();

    let start = Instant::now();
    let envelope = client
        .execute("while True: pass", Some(1000))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(!envelope.success);
    assert_eq!(envelope.error_type.as_deref(), Some("TimeoutError"));
    // Within [t, t + 5s] of submission.
    assert!(elapsed >= Duration::from_millis(1000), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "returned too late: {elapsed:?}");
}

#[tokio::test]
async fn test_concurrent_executes_serialize() {
    let (server, runtime) = common::start_server(false).await;
    let client = std::sync::Arc::new(client_for(server.socket_addr()));
    client.connect().await.unwrap();

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .execute("import time\ntime.sleep(0.1)\n_result_ = 'slept'", None)
                .await
        }));
    }
    for handle in handles {
        let envelope = handle.await.unwrap().unwrap();
        assert!(envelope.success);
    }
    let elapsed = start.elapsed();

    // 8 sleeps of 100ms serialized on one runtime cannot finish under 800ms.
    assert!(elapsed >= Duration::from_millis(800), "scripts overlapped: {elapsed:?}");

    // No interleaving: every start is immediately followed by its own end.
    let spans = runtime.span_log();
    let sleep_spans: Vec<_> = spans
        .iter()
        .filter(|(script, _)| script.contains("time.sleep"))
        .collect();
    assert_eq!(sleep_spans.len(), 16);
    for pair in sleep_spans.chunks(2) {
        assert_eq!(pair[0].1, "start");
        assert_eq!(pair[1].1, "end");
        assert_eq!(pair[0].0, pair[1].0);
    }
}

#[tokio::test]
async fn test_get_documents_roundtrip() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();

    let docs = client.get_documents().await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "Demo");
    assert_eq!(docs[0].objects, vec!["Box"]);
}

#[tokio::test]
async fn test_version_and_ui_available() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();

    let version = client.get_version().await.unwrap();
    assert_eq!(version.version, "1.0.0");
    assert!(!client.ui_available().await.unwrap());
}

#[tokio::test]
async fn test_not_connected_rejected() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    // No connect().
    let err = client.execute("_result_ = 1", None).await.unwrap_err();
    assert!(matches!(err, freecad_bridge::Error::NotConnected(_)));
}

#[tokio::test]
async fn test_in_flight_requests_match_ids() {
    // Drive the wire protocol directly to observe ids.
    let (server, _runtime) = common::start_server(false).await;
    let stream = TcpStream::connect(server.socket_addr()).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    // Two in-flight requests on one connection: a slow execute and a ping.
    let slow = json!({
        "jsonrpc": "2.0", "id": 1, "method": "execute",
        "params": { "script": "import time\ntime.sleep(0.1)\n_result_ = 'slept'" }
    });
    let fast = json!({ "jsonrpc": "2.0", "id": 2, "method": "ping", "params": {} });
    write
        .write_all(format!("{slow}\n{fast}\n").as_bytes())
        .await
        .unwrap();

    let first: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    let second: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

    // The ping overtakes the sleeping execute; ids still match payloads.
    assert_eq!(first["id"], json!(2));
    assert_eq!(first["result"], json!("pong"));
    assert_eq!(second["id"], json!(1));
    assert_eq!(second["result"]["success"], json!(true));
}

#[tokio::test]
async fn test_malformed_line_gets_parse_error() {
    let (server, _runtime) = common::start_server(false).await;
    let stream = TcpStream::connect(server.socket_addr()).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"this is not json\n").await.unwrap();

    let response: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response["error"]["code"], json!(-32700));

    // Connection survives the bad frame.
    let ping = json!({ "jsonrpc": "2.0", "id": 9, "method": "ping", "params": {} });
    write
        .write_all(format!("{ping}\n").as_bytes())
        .await
        .unwrap();
    let response: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response["id"], json!(9));
}

#[tokio::test]
async fn test_unknown_method_error() {
    let (server, _runtime) = common::start_server(false).await;
    let stream = TcpStream::connect(server.socket_addr()).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    let request = json!({ "jsonrpc": "2.0", "id": 1, "method": "explode", "params": {} });
    write
        .write_all(format!("{request}\n").as_bytes())
        .await
        .unwrap();

    let response: serde_json::Value =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn test_disconnect_transitions_state() {
    let (server, _runtime) = common::start_server(false).await;
    let client = client_for(server.socket_addr());
    client.connect().await.unwrap();
    assert!(client.is_connected().await);

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let err = client.ping().await.unwrap_err();
    assert!(matches!(
        err,
        freecad_bridge::Error::NotConnected(_) | freecad_bridge::Error::ConnectionLost(_)
    ));
}
