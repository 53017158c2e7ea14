//! Socket bridge client: newline-delimited JSON-RPC over one TCP
//! connection, with request multiplexing.
//!
//! A single reader task owns the read half and routes each response to the
//! oneshot waiting on its id; writes are serialized behind a mutex. On EOF
//! every pending caller is woken with `ConnectionLost` and the pending map
//! is discarded; reconnecting never resurrects old ids.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::bridge::{
    parse_active_document, parse_console_lines, parse_documents, spawn_health_task, BridgeClient,
    ConnectionState, DocumentInfo, StateCell, VersionInfo, TRANSPORT_GRACE,
};
use crate::engine::ExecutionResult;
use crate::error::{Error, Result};

type PendingMap = Arc<Mutex<HashMap<i64, oneshot::Sender<Value>>>>;

pub struct SocketClient {
    addr: String,
    default_timeout: Duration,
    health_interval: Duration,
    state: Arc<StateCell>,
    next_id: Arc<AtomicI64>,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    pending: PendingMap,
}

impl SocketClient {
    pub fn new(addr: String, default_timeout: Duration, health_interval: Duration) -> Self {
        Self {
            addr,
            default_timeout,
            health_interval,
            state: Arc::new(StateCell::default()),
            next_id: Arc::new(AtomicI64::new(1)),
            writer: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn open_connection(&self) -> Result<()> {
        self.state.set(ConnectionState::Connecting);

        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            self.state.set(ConnectionState::Disconnected);
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                Error::ConnectionRefused(self.addr.clone())
            } else {
                Error::Io(e)
            }
        })?;
        stream.set_nodelay(true).ok();

        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(write_half);

        // Reader task: demultiplex responses until EOF, then drain.
        let pending = self.pending.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let response: Value = match serde_json::from_str(&line) {
                            Ok(v) => v,
                            Err(e) => {
                                warn!("Unparseable response line dropped: {e}");
                                continue;
                            }
                        };
                        let id = response.get("id").and_then(Value::as_i64);
                        if let Some(id) = id {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(response);
                            } else {
                                // Orphaned reply from an abandoned request.
                                debug!("Discarding reply for unknown id {id}");
                            }
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            // EOF or read error: wake every pending caller.
            let drained: Vec<_> = pending.lock().await.drain().collect();
            if !drained.is_empty() {
                debug!("Connection closed with {} pending requests", drained.len());
            }
            drop(drained);
            if state.get() != ConnectionState::Closing {
                state.set(ConnectionState::Disconnected);
            }
        });

        Ok(())
    }

    /// Issue one request and await its matching response.
    async fn call_raw(&self, method: &str, params: Value, deadline: Duration) -> Result<Value> {
        if self.state.get() != ConnectionState::Connected
            && self.state.get() != ConnectionState::Connecting
        {
            return Err(Error::NotConnected("socket".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        let mut line = serde_json::to_string(&frame)?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        {
            let mut writer = self.writer.lock().await;
            let w = writer
                .as_mut()
                .ok_or_else(|| Error::NotConnected("socket".to_string()))?;
            if let Err(e) = w.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(Error::ConnectionLost(e.to_string()));
            }
            if let Err(e) = w.flush().await {
                self.pending.lock().await.remove(&id);
                return Err(Error::ConnectionLost(e.to_string()));
            }
        }

        let response = match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                // Reader drained the pending map: the connection died.
                return Err(Error::ConnectionLost(format!(
                    "connection to {} closed mid-call",
                    self.addr
                )));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(Error::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                });
            }
        };

        if let Some(error) = response.get("error") {
            let error_type = error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("ProtocolError")
                .to_string();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            // Frame-level errors carry a JSON-RPC code; script failures
            // carry type/message/traceback only.
            if error.get("code").is_some() {
                return Err(Error::Protocol(format!("{error_type}: {message}")));
            }
            let traceback = error
                .get("traceback")
                .and_then(Value::as_str)
                .map(String::from);
            return Err(Error::Script {
                error_type,
                message,
                traceback,
            });
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Read-only calls reconnect-and-retry once on a broken transport.
    /// A client that was never connected (or was told to disconnect) is
    /// not resurrected here; that stays the caller's decision.
    async fn call_idempotent(&self, method: &str, params: Value) -> Result<Value> {
        let deadline = self.default_timeout + TRANSPORT_GRACE;
        match self.call_raw(method, params.clone(), deadline).await {
            Err(e @ Error::ConnectionLost(_)) => {
                debug!("Retrying idempotent {method} after reconnect: {e}");
                self.connect().await?;
                self.call_raw(method, params, deadline).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl BridgeClient for SocketClient {
    async fn connect(&self) -> Result<()> {
        self.open_connection().await?;

        // Handshake: the client is connected only after a live round trip.
        let deadline = self.default_timeout + TRANSPORT_GRACE;
        self.call_raw("ping", json!({}), deadline).await?;
        let version = self.call_raw("get_version", json!({}), deadline).await;

        self.state.set(ConnectionState::Connected);
        if let Ok(v) = version {
            debug!(
                "Connected to FreeCAD {} over socket",
                v.get("version").and_then(|v| v.as_str()).unwrap_or("?")
            );
        }

        let state = self.state.clone();
        let pending = self.pending.clone();
        let writer = self.writer.clone();
        let next_id = self.next_id.clone();
        spawn_health_task(self.state.clone(), self.health_interval, move || {
            let state = state.clone();
            let pending = pending.clone();
            let writer = writer.clone();
            let next_id = next_id.clone();
            async move {
                health_ping(&state, &pending, &writer, &next_id).await
            }
        });

        Ok(())
    }

    async fn disconnect(&self) {
        self.state.set(ConnectionState::Closing);
        if let Some(mut w) = self.writer.lock().await.take() {
            let _ = w.shutdown().await;
        }
        self.pending.lock().await.clear();
        self.state.set(ConnectionState::Disconnected);
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    async fn ping(&self) -> Result<()> {
        let value = self.call_idempotent("ping", json!({})).await?;
        if value == json!("pong") {
            Ok(())
        } else {
            Err(Error::Protocol(format!("unexpected ping reply: {value}")))
        }
    }

    async fn execute(&self, script: &str, timeout_ms: Option<u64>) -> Result<ExecutionResult> {
        let timeout_ms = timeout_ms.unwrap_or(self.default_timeout.as_millis() as u64);
        let deadline = Duration::from_millis(timeout_ms) + TRANSPORT_GRACE;
        let params = json!({ "script": script, "timeout_ms": timeout_ms });
        // No retry: a lost connection leaves the script outcome unknown.
        let value = self.call_raw("execute", params, deadline).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_documents(&self) -> Result<Vec<DocumentInfo>> {
        parse_documents(self.call_idempotent("get_documents", json!({})).await?)
    }

    async fn get_active_document(&self) -> Result<Option<DocumentInfo>> {
        parse_active_document(
            self.call_idempotent("get_active_document", json!({}))
                .await?,
        )
    }

    async fn get_object(&self, doc: Option<&str>, name: &str) -> Result<Value> {
        self.call_idempotent("get_object", json!({ "doc": doc, "name": name }))
            .await
    }

    async fn get_console_output(&self, lines: u64) -> Result<Vec<String>> {
        parse_console_lines(
            self.call_idempotent("get_console_output", json!({ "lines": lines }))
                .await?,
        )
    }

    async fn get_version(&self) -> Result<VersionInfo> {
        let value = self.call_idempotent("get_version", json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn ui_available(&self) -> Result<bool> {
        let value = self.call_idempotent("ui_available", json!({})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn mode(&self) -> &'static str {
        "socket"
    }
}

/// Standalone ping used by the health monitor (it cannot borrow `self`
/// across the task boundary).
async fn health_ping(
    state: &StateCell,
    pending: &PendingMap,
    writer: &Mutex<Option<OwnedWriteHalf>>,
    next_id: &AtomicI64,
) -> Result<()> {
    if state.get() != ConnectionState::Connected {
        return Err(Error::NotConnected("socket".to_string()));
    }

    let id = next_id.fetch_add(1, Ordering::SeqCst);
    let frame = json!({ "jsonrpc": "2.0", "id": id, "method": "ping", "params": {} });
    let mut line = serde_json::to_string(&frame)?;
    line.push('\n');

    let (tx, rx) = oneshot::channel();
    pending.lock().await.insert(id, tx);

    {
        let mut guard = writer.lock().await;
        let w = guard
            .as_mut()
            .ok_or_else(|| Error::NotConnected("socket".to_string()))?;
        w.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::ConnectionLost(e.to_string()))?;
        w.flush()
            .await
            .map_err(|e| Error::ConnectionLost(e.to_string()))?;
    }

    match tokio::time::timeout(Duration::from_secs(2), rx).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(Error::ConnectionLost("connection closed".to_string())),
        Err(_) => {
            pending.lock().await.remove(&id);
            Err(Error::Timeout { timeout_ms: 2000 })
        }
    }
}
