//! Embedded bridge client: FreeCAD in the current process.
//!
//! Used when the adapter runs inside a Python-capable FreeCAD host that
//! can hand us a [`ScriptRuntime`] directly. No sockets: calls go through
//! the same method table the wire servers use, so behavior is identical
//! method-for-method.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::bridge::{
    parse_active_document, parse_console_lines, parse_documents, BridgeClient, ConnectionState,
    DocumentInfo, StateCell, VersionInfo,
};
use crate::dispatch;
use crate::engine::{ExecutionEngine, ExecutionResult};
use crate::error::{Error, Result};
use crate::runtime::ScriptRuntime;
use crate::server::methods::MethodTable;

pub struct EmbeddedClient {
    table: MethodTable,
    state: Arc<StateCell>,
    default_timeout_ms: u64,
}

impl EmbeddedClient {
    /// Wrap an in-process runtime. The dispatcher pump runs on a worker
    /// thread; with no GUI event loop in this configuration there is no
    /// UI thread to defer to, only the serialization guarantee to keep.
    pub fn new(runtime: Arc<dyn ScriptRuntime>, default_timeout: Duration) -> Self {
        let (dispatcher, pump) = dispatch::channel(dispatch::DEFAULT_QUEUE_CAPACITY);
        pump.spawn();

        let engine = ExecutionEngine::new(runtime, dispatcher, default_timeout);
        let table = MethodTable::new(engine, Uuid::new_v4().to_string(), 0, 0);

        Self {
            table,
            state: Arc::new(StateCell::default()),
            default_timeout_ms: default_timeout.as_millis() as u64,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.state.get() != ConnectionState::Connected {
            return Err(Error::NotConnected("embedded".to_string()));
        }
        self.table.dispatch(method, &params).await
    }
}

#[async_trait]
impl BridgeClient for EmbeddedClient {
    async fn connect(&self) -> Result<()> {
        self.state.set(ConnectionState::Connecting);
        // Same handshake as the remote clients, minus the wire.
        let pong = self.table.dispatch("ping", &json!({})).await?;
        if pong != json!("pong") {
            self.state.set(ConnectionState::Disconnected);
            return Err(Error::Protocol(format!("unexpected ping reply: {pong}")));
        }
        self.state.set(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        self.state.set(ConnectionState::Disconnected);
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    async fn ping(&self) -> Result<()> {
        self.call("ping", json!({})).await.map(|_| ())
    }

    async fn execute(&self, script: &str, timeout_ms: Option<u64>) -> Result<ExecutionResult> {
        let timeout_ms = timeout_ms.unwrap_or(self.default_timeout_ms);
        let value = self
            .call(
                "execute",
                json!({ "script": script, "timeout_ms": timeout_ms }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_documents(&self) -> Result<Vec<DocumentInfo>> {
        parse_documents(self.call("get_documents", json!({})).await?)
    }

    async fn get_active_document(&self) -> Result<Option<DocumentInfo>> {
        parse_active_document(self.call("get_active_document", json!({})).await?)
    }

    async fn get_object(&self, doc: Option<&str>, name: &str) -> Result<Value> {
        self.call("get_object", json!({ "doc": doc, "name": name }))
            .await
    }

    async fn get_console_output(&self, lines: u64) -> Result<Vec<String>> {
        parse_console_lines(
            self.call("get_console_output", json!({ "lines": lines }))
                .await?,
        )
    }

    async fn get_version(&self) -> Result<VersionInfo> {
        let value = self.call("get_version", json!({})).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn ui_available(&self) -> Result<bool> {
        let value = self.call("ui_available", json!({})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn mode(&self) -> &'static str {
        "embedded"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ScriptFault, ScriptOutput};

    struct EchoRuntime;

    impl ScriptRuntime for EchoRuntime {
        fn run(&self, script: &str) -> std::result::Result<ScriptOutput, ScriptFault> {
            if script.contains("FreeCAD.Version()") {
                return Ok(ScriptOutput {
                    value: Some(json!({ "version": "1.0.0", "gui_available": false })),
                    ..Default::default()
                });
            }
            Ok(ScriptOutput {
                value: Some(json!(script.len())),
                ..Default::default()
            })
        }

        fn ui_available(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_connect_then_execute() {
        let client = EmbeddedClient::new(Arc::new(EchoRuntime), Duration::from_secs(5));
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);

        let envelope = client.execute("_result_ = 1", None).await.unwrap();
        assert!(envelope.success);
    }

    #[tokio::test]
    async fn test_rejects_calls_before_connect() {
        let client = EmbeddedClient::new(Arc::new(EchoRuntime), Duration::from_secs(5));
        let err = client.execute("_result_ = 1", None).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_version_through_method_table() {
        let client = EmbeddedClient::new(Arc::new(EchoRuntime), Duration::from_secs(5));
        client.connect().await.unwrap();
        let version = client.get_version().await.unwrap();
        assert_eq!(version.version, "1.0.0");
        assert!(!version.gui_available);
    }
}
