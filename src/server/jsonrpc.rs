//! Newline-delimited JSON-RPC 2.0 socket server.
//!
//! One request object per line, one response line per request. Multiple
//! requests may be in flight on a single connection; a per-connection
//! fan-in channel serializes the writes while handlers run concurrently.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::server::methods::MethodTable;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Accept loop. Runs until the listener errors or the task is aborted.
pub async fn serve(listener: TcpListener, table: MethodTable) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Socket client connected: {peer}");
                let table = table.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, table).await {
                        debug!("Socket connection ended: {e}");
                    }
                });
            }
            Err(e) => {
                error!("Socket accept failed: {e}");
                break;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, table: MethodTable) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Handlers push finished responses here; a single writer task owns the
    // socket's write half so concurrent in-flight requests cannot corrupt
    // the framing.
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                let response = error_response(Value::Null, PARSE_ERROR, "Parse error", Some(e.to_string()));
                let _ = out_tx.send(response.to_string()).await;
                continue;
            }
        };

        let table = table.clone();
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            let response = process_request(&table, request).await;
            let _ = out_tx.send(response.to_string()).await;
        });
    }

    drop(out_tx);
    let _ = writer_task.await;
    info!("Socket client disconnected");
    Ok(())
}

async fn process_request(table: &MethodTable, request: Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = match request.get("method").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => {
            return error_response(id, INVALID_REQUEST, "Invalid request", Some("missing method".to_string()))
        }
    };
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    match table.dispatch(&method, &params).await {
        Ok(result) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        Err(Error::Protocol(msg)) if msg.starts_with("Method not found") => {
            error_response(id, METHOD_NOT_FOUND, "Method not found", Some(msg))
        }
        Err(Error::Script {
            error_type,
            message,
            traceback,
        }) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "type": error_type,
                "message": message,
                "traceback": traceback,
            },
        }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {
                "type": e.kind().as_str(),
                "message": e.to_string(),
            },
        }),
    }
}

fn error_response(id: Value, code: i32, message: &str, data: Option<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "type": "ProtocolError",
            "message": message,
            "data": data,
        },
    })
}
