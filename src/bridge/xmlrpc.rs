//! XML-RPC bridge client: one HTTP POST per call.
//!
//! This is the default mode; it matches the wire protocol of the workbench
//! addon. Server faults carry the error kind on the first line of the
//! fault string, which is lifted back into a typed error here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::bridge::{
    parse_active_document, parse_console_lines, parse_documents, spawn_health_task, BridgeClient,
    ConnectionState, DocumentInfo, StateCell, VersionInfo, TRANSPORT_GRACE,
};
use crate::engine::ExecutionResult;
use crate::error::{Error, ErrorKind, Result};
use crate::wire::xmlrpc::{self, XmlValue};

pub struct XmlRpcClient {
    url: String,
    http: reqwest::Client,
    default_timeout: Duration,
    health_interval: Duration,
    state: Arc<StateCell>,
}

impl XmlRpcClient {
    pub fn new(url: String, default_timeout: Duration, health_interval: Duration) -> Self {
        Self {
            url,
            // One pooled connection is plenty for a serialized backend.
            http: reqwest::Client::builder()
                .pool_max_idle_per_host(1)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            default_timeout,
            health_interval,
            state: Arc::new(StateCell::default()),
        }
    }

    async fn call_raw(
        &self,
        method: &str,
        params: &[XmlValue],
        deadline: Duration,
    ) -> Result<Value> {
        let body = xmlrpc::write_method_call(method, params);

        let response = self
            .http
            .post(&self.url)
            .header("content-type", "text/xml")
            .timeout(deadline)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::ConnectionRefused(self.url.clone())
                } else if e.is_timeout() {
                    Error::Timeout {
                        timeout_ms: deadline.as_millis() as u64,
                    }
                } else {
                    Error::ConnectionLost(e.to_string())
                }
            })?;

        let text = response.text().await.map_err(Error::Http)?;
        match xmlrpc::parse_method_response(&text) {
            Ok(value) => Ok(value.to_json()),
            Err(Error::Protocol(fault)) => Err(lift_fault(&fault)),
            Err(e) => Err(e),
        }
    }

    async fn call_idempotent(&self, method: &str, params: Vec<XmlValue>) -> Result<Value> {
        if self.state.get() == ConnectionState::Disconnected {
            return Err(Error::NotConnected("xmlrpc".to_string()));
        }
        let deadline = self.default_timeout + TRANSPORT_GRACE;
        match self.call_raw(method, &params, deadline).await {
            Err(e) if e.is_retriable() => {
                debug!("Retrying idempotent {method} once: {e}");
                self.call_raw(method, &params, deadline).await
            }
            other => other,
        }
    }
}

/// Map a fault string of the form `Kind: message` back to a typed error.
fn lift_fault(fault: &str) -> Error {
    // The fault body looks like "fault -32500: ScriptError: boom".
    let message = fault
        .split_once(": ")
        .map(|(_, rest)| rest)
        .unwrap_or(fault);
    let kind = message.split(':').next().unwrap_or("").trim();
    match kind {
        k if k == ErrorKind::Timeout.as_str() => Error::Timeout { timeout_ms: 0 },
        k if k == ErrorKind::Overloaded.as_str() => Error::Overloaded { capacity: 0 },
        k if k == ErrorKind::UIUnavailable.as_str() => Error::UiUnavailable(message.to_string()),
        k if k == ErrorKind::ScriptError.as_str() => Error::Script {
            error_type: "ScriptError".to_string(),
            message: message.to_string(),
            traceback: None,
        },
        _ => Error::Protocol(fault.to_string()),
    }
}

#[async_trait]
impl BridgeClient for XmlRpcClient {
    async fn connect(&self) -> Result<()> {
        self.state.set(ConnectionState::Connecting);

        let deadline = self.default_timeout + TRANSPORT_GRACE;
        let handshake = async {
            let pong = self.call_raw("ping", &[], deadline).await?;
            if pong != serde_json::json!("pong") {
                return Err(Error::Protocol(format!("unexpected ping reply: {pong}")));
            }
            self.call_raw("get_version", &[], deadline).await
        };

        match handshake.await {
            Ok(version) => {
                self.state.set(ConnectionState::Connected);
                debug!(
                    "Connected to FreeCAD {} over XML-RPC",
                    version
                        .get("version")
                        .and_then(|v| v.as_str())
                        .unwrap_or("?")
                );
            }
            Err(e) => {
                self.state.set(ConnectionState::Disconnected);
                return Err(e);
            }
        }

        let url = self.url.clone();
        let http = self.http.clone();
        spawn_health_task(self.state.clone(), self.health_interval, move || {
            let url = url.clone();
            let http = http.clone();
            async move {
                let body = xmlrpc::write_method_call("ping", &[]);
                let response = http
                    .post(&url)
                    .header("content-type", "text/xml")
                    .timeout(Duration::from_secs(2))
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| Error::ConnectionLost(e.to_string()))?;
                let text = response.text().await.map_err(Error::Http)?;
                xmlrpc::parse_method_response(&text)?;
                Ok(())
            }
        });

        Ok(())
    }

    async fn disconnect(&self) {
        self.state.set(ConnectionState::Closing);
        self.state.set(ConnectionState::Disconnected);
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }

    async fn ping(&self) -> Result<()> {
        let value = self.call_idempotent("ping", vec![]).await?;
        if value == serde_json::json!("pong") {
            Ok(())
        } else {
            Err(Error::Protocol(format!("unexpected ping reply: {value}")))
        }
    }

    async fn execute(&self, script: &str, timeout_ms: Option<u64>) -> Result<ExecutionResult> {
        if self.state.get() != ConnectionState::Connected {
            return Err(Error::NotConnected("xmlrpc".to_string()));
        }
        let timeout_ms = timeout_ms.unwrap_or(self.default_timeout.as_millis() as u64);
        let deadline = Duration::from_millis(timeout_ms) + TRANSPORT_GRACE;
        let params = vec![
            XmlValue::Str(script.to_string()),
            XmlValue::Int(timeout_ms.min(i32::MAX as u64) as i32),
        ];
        // No retry for execute: a lost connection mid-script leaves the
        // outcome unknown.
        let value = match self.call_raw("execute", &params, deadline).await {
            Ok(v) => v,
            Err(e @ Error::ConnectionRefused(_)) => {
                return Err(Error::ConnectionLost(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn get_documents(&self) -> Result<Vec<DocumentInfo>> {
        parse_documents(self.call_idempotent("get_documents", vec![]).await?)
    }

    async fn get_active_document(&self) -> Result<Option<DocumentInfo>> {
        parse_active_document(self.call_idempotent("get_active_document", vec![]).await?)
    }

    async fn get_object(&self, doc: Option<&str>, name: &str) -> Result<Value> {
        let params = vec![
            doc.map(|d| XmlValue::Str(d.to_string()))
                .unwrap_or(XmlValue::Nil),
            XmlValue::Str(name.to_string()),
        ];
        self.call_idempotent("get_object", params).await
    }

    async fn get_console_output(&self, lines: u64) -> Result<Vec<String>> {
        let params = vec![XmlValue::Int(lines.min(i32::MAX as u64) as i32)];
        parse_console_lines(self.call_idempotent("get_console_output", params).await?)
    }

    async fn get_version(&self) -> Result<VersionInfo> {
        let value = self.call_idempotent("get_version", vec![]).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn ui_available(&self) -> Result<bool> {
        let value = self.call_idempotent("ui_available", vec![]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn mode(&self) -> &'static str {
        "xmlrpc"
    }
}
