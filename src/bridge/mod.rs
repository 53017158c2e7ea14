//! Bridge clients: the uniform client-side interface to FreeCAD.
//!
//! Three implementations of [`BridgeClient`] (XML-RPC, socket, embedded)
//! behind one trait, selected by configuration. All state
//! machines, id allocation, and reconnect policy live here; the tool layer
//! only sees the trait.

pub mod embedded;
pub mod socket;
pub mod xmlrpc;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{BridgeMode, Config};
use crate::engine::ExecutionResult;
use crate::error::{Error, Result};

/// Grace added on top of the script timeout for the transport deadline, so
/// a slow script yields a clean `Timeout` envelope from the server instead
/// of a transport-level failure on the client.
pub const TRANSPORT_GRACE: Duration = Duration::from_secs(5);

/// Consecutive health-ping failures before the client gives up.
pub const HEALTH_FAILURE_LIMIT: u32 = 3;

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Summary of an open document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentInfo {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub is_modified: bool,
    #[serde(default)]
    pub active_object: Option<String>,
}

/// FreeCAD version report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub build_date: Option<String>,
    #[serde(default)]
    pub python_version: Option<String>,
    #[serde(default)]
    pub gui_available: bool,
}

/// Uniform client interface over the three transports.
///
/// `execute` is never auto-retried: a lost connection mid-script leaves
/// the outcome unknown, so the failure surfaces as `ConnectionLost`. The
/// read-only methods reconnect-and-retry once.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Establish the connection and run the ping/version handshake.
    async fn connect(&self) -> Result<()>;

    /// Tear down the connection. Pending requests see `ConnectionLost`.
    async fn disconnect(&self);

    /// Current state, without touching the wire.
    fn state(&self) -> ConnectionState;

    async fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Round-trip liveness probe.
    async fn ping(&self) -> Result<()>;

    /// Execute a script in FreeCAD, returning the envelope.
    async fn execute(&self, script: &str, timeout_ms: Option<u64>) -> Result<ExecutionResult>;

    async fn get_documents(&self) -> Result<Vec<DocumentInfo>>;

    async fn get_active_document(&self) -> Result<Option<DocumentInfo>>;

    async fn get_object(&self, doc: Option<&str>, name: &str) -> Result<Value>;

    async fn get_console_output(&self, lines: u64) -> Result<Vec<String>>;

    async fn get_version(&self) -> Result<VersionInfo>;

    /// Whether the FreeCAD GUI event loop is running.
    async fn ui_available(&self) -> Result<bool>;

    /// Transport label for logs and error messages.
    fn mode(&self) -> &'static str;
}

impl std::fmt::Debug for dyn BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BridgeClient({})", self.mode())
    }
}

/// Build the configured client. Embedded mode needs an in-process FreeCAD
/// interpreter, which a standalone adapter process does not have; that is
/// a configuration error at startup, not a runtime surprise.
pub fn create_client(config: &Config) -> Result<Arc<dyn BridgeClient>> {
    match config.mode {
        BridgeMode::Xmlrpc => Ok(Arc::new(xmlrpc::XmlRpcClient::new(
            config.xmlrpc_url(),
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.health_interval_ms),
        ))),
        BridgeMode::Socket => Ok(Arc::new(socket::SocketClient::new(
            config.socket_addr(),
            Duration::from_millis(config.timeout_ms),
            Duration::from_millis(config.health_interval_ms),
        ))),
        BridgeMode::Embedded => Err(Error::Config(format!(
            "embedded mode requires running inside FreeCAD; construct EmbeddedClient \
             with a ScriptRuntime instead (runtime_path: {:?})",
            config.runtime_path
        ))),
    }
}

/// Shared mutable state cell used by every client implementation.
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    state: Mutex<ConnectionState>,
}

impl StateCell {
    pub fn get(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub fn set(&self, next: ConnectionState) {
        let mut guard = self.state.lock().unwrap();
        debug!("Bridge client state: {:?} -> {:?}", *guard, next);
        *guard = next;
    }

    /// Compare-and-set; returns false when the current state differs.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let mut guard = self.state.lock().unwrap();
        if *guard == from {
            *guard = to;
            true
        } else {
            false
        }
    }
}

/// Background health monitor: ping at `interval`, drop to `Disconnected`
/// after [`HEALTH_FAILURE_LIMIT`] consecutive failures. The task exits on
/// its own once the client leaves the `Connected` state.
pub(crate) fn spawn_health_task<F, Fut>(
    state: Arc<StateCell>,
    interval: Duration,
    ping: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut failures = 0u32;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so a fresh connection
        // is not pinged twice in a row.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if state.get() != ConnectionState::Connected {
                break;
            }
            match ping().await {
                Ok(()) => failures = 0,
                Err(e) => {
                    failures += 1;
                    warn!("Health ping failed ({failures}/{HEALTH_FAILURE_LIMIT}): {e}");
                    if failures >= HEALTH_FAILURE_LIMIT {
                        state.set(ConnectionState::Disconnected);
                        break;
                    }
                }
            }
        }
        debug!("Health monitor exited");
    })
}

/// Decode a `get_documents` payload.
pub(crate) fn parse_documents(value: Value) -> Result<Vec<DocumentInfo>> {
    match value {
        Value::Null => Ok(Vec::new()),
        v => Ok(serde_json::from_value(v)?),
    }
}

/// Decode a `get_active_document` payload.
pub(crate) fn parse_active_document(value: Value) -> Result<Option<DocumentInfo>> {
    match value {
        Value::Null => Ok(None),
        v => Ok(Some(serde_json::from_value(v)?)),
    }
}

/// Decode a `get_console_output` payload.
pub(crate) fn parse_console_lines(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        v => Ok(serde_json::from_value(v)?),
    }
}
