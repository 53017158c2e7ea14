//! MCP transport layer.
//!
//! The stdio transport frames one JSON-RPC message per line. Logging must
//! stay on stderr: stdout belongs to the protocol.

use async_trait::async_trait;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::error::Result;
use crate::mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// A message that can be sent or received.
#[derive(Debug, Clone)]
pub enum Message {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl Message {
    fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Message::Request(req) => serde_json::to_string(req),
            Message::Response(res) => serde_json::to_string(res),
            Message::Notification(notif) => serde_json::to_string(notif),
        }
    }
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the transport, returning channels for messages.
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)>;

    /// Stop the transport.
    async fn stop(&mut self) -> Result<()>;
}

/// Stdio transport for MCP.
#[derive(Default)]
pub struct StdioTransport {
    running: bool,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> Result<(mpsc::Receiver<Message>, mpsc::Sender<Message>)> {
        self.running = true;

        let (incoming_tx, incoming_rx) = mpsc::channel::<Message>(100);
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(100);

        // Reader: one message per stdin line.
        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("EOF on stdin, stopping transport");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        trace!("Received: {}", trimmed);

                        // Requests carry an id; notifications do not.
                        if let Ok(req) = serde_json::from_str::<JsonRpcRequest>(trimmed) {
                            if incoming_tx.send(Message::Request(req)).await.is_err() {
                                break;
                            }
                        } else if let Ok(notif) =
                            serde_json::from_str::<JsonRpcNotification>(trimmed)
                        {
                            if incoming_tx.send(Message::Notification(notif)).await.is_err() {
                                break;
                            }
                        } else {
                            error!("Failed to parse message: {}", trimmed);
                        }
                    }
                    Err(e) => {
                        error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        // Writer: serialize each outgoing message onto one stdout line.
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();

            while let Some(msg) = outgoing_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(s) => s,
                    Err(e) => {
                        error!("Error serializing message: {}", e);
                        continue;
                    }
                };
                trace!("Sending: {}", json);
                let write = async {
                    stdout.write_all(json.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                    stdout.flush().await
                };
                if let Err(e) = write.await {
                    error!("Error writing to stdout: {}", e);
                    break;
                }
            }
        });

        Ok((incoming_rx, outgoing_tx))
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }
}
