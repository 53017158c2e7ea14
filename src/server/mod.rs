//! The CAD-side bridge server.
//!
//! Runs inside the FreeCAD process: the workbench hands over a
//! [`ScriptRuntime`] and calls [`BridgeServer::start`] from its startup
//! code. Two wire servers (XML-RPC and newline-JSON) share one method
//! table, one execution engine, and one dispatcher.
//!
//! Neither server authenticates: this is a local-machine tool and both
//! listeners bind loopback unless `allow_remote` is explicitly set.

pub mod jsonrpc;
pub mod methods;
pub mod xmlrpc;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::{self, DispatcherPump, DEFAULT_QUEUE_CAPACITY, DEFAULT_TICK_INTERVAL};
use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};
use crate::runtime::ScriptRuntime;
use methods::MethodTable;

/// Server-side settings. Defaults mirror the workbench configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub xmlrpc_port: u16,
    pub socket_port: u16,
    pub default_timeout: Duration,
    pub queue_capacity: usize,
    pub tick_interval: Duration,
    /// Allow binding a non-loopback address. Off by default; the wire
    /// protocols carry no authentication.
    pub allow_remote: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            xmlrpc_port: crate::config::DEFAULT_XMLRPC_PORT,
            socket_port: crate::config::DEFAULT_SOCKET_PORT,
            default_timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_interval: DEFAULT_TICK_INTERVAL,
            allow_remote: false,
        }
    }
}

/// Handle to the running pair of wire servers.
pub struct BridgeServer {
    instance_id: String,
    xmlrpc_addr: std::net::SocketAddr,
    socket_addr: std::net::SocketAddr,
    table: MethodTable,
    tasks: Vec<JoinHandle<()>>,
    /// Present in GUI mode: the embedding must drive it from its UI timer.
    pump: Option<DispatcherPump>,
}

impl std::fmt::Debug for BridgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeServer")
            .field("instance_id", &self.instance_id)
            .field("xmlrpc_addr", &self.xmlrpc_addr)
            .field("socket_addr", &self.socket_addr)
            .finish_non_exhaustive()
    }
}

impl BridgeServer {
    /// Bind both listeners and start serving.
    ///
    /// In headless mode the dispatcher pump runs on an internal worker
    /// thread. In GUI mode the caller must take the pump with
    /// [`BridgeServer::take_pump`] and call `tick` from the Qt timer
    /// (interrupting FreeCAD from any other thread corrupts documents).
    ///
    /// Fails if either port is taken, so a second instance refuses to
    /// start rather than split traffic.
    pub async fn start(runtime: Arc<dyn ScriptRuntime>, config: ServerConfig) -> Result<Self> {
        if !config.allow_remote {
            let ip: Option<IpAddr> = config.host.parse().ok();
            let loopback = config.host == "localhost" || ip.map(|ip| ip.is_loopback()).unwrap_or(false);
            if !loopback {
                return Err(Error::Config(format!(
                    "refusing to bind non-loopback host {:?} without allow_remote",
                    config.host
                )));
            }
        }

        let instance_id = Uuid::new_v4().to_string();

        let (dispatcher, pump) = dispatch::channel(config.queue_capacity);
        let engine = ExecutionEngine::new(runtime.clone(), dispatcher, config.default_timeout);

        let socket_listener =
            TcpListener::bind((config.host.as_str(), config.socket_port)).await?;
        let xmlrpc_listener =
            TcpListener::bind((config.host.as_str(), config.xmlrpc_port)).await?;
        let socket_addr = socket_listener.local_addr()?;
        let xmlrpc_addr = xmlrpc_listener.local_addr()?;

        let table = MethodTable::new(
            engine,
            instance_id.clone(),
            xmlrpc_addr.port(),
            socket_addr.port(),
        );

        let mut tasks = Vec::new();

        let json_table = table.clone();
        tasks.push(tokio::spawn(async move {
            jsonrpc::serve(socket_listener, json_table).await;
        }));

        let app = xmlrpc::router(table.clone());
        tasks.push(tokio::spawn(async move {
            if let Err(e) = axum::serve(xmlrpc_listener, app).await {
                tracing::error!("XML-RPC server stopped: {e}");
            }
        }));

        // Printed on stdout for test automation to capture.
        println!("FREECAD_MCP_BRIDGE_INSTANCE_ID={instance_id}");
        info!(
            "Bridge started (instance {instance_id}): XML-RPC {xmlrpc_addr}, socket {socket_addr}"
        );

        let pump = if runtime.ui_available() {
            Some(pump)
        } else {
            info!("Headless mode: dispatcher pump running on worker thread");
            pump.spawn();
            None
        };

        Ok(Self {
            instance_id,
            xmlrpc_addr,
            socket_addr,
            table,
            tasks,
            pump,
        })
    }

    /// GUI mode only: the pump the embedding must drive from its UI timer.
    pub fn take_pump(&mut self) -> Option<DispatcherPump> {
        self.pump.take()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn xmlrpc_addr(&self) -> std::net::SocketAddr {
        self.xmlrpc_addr
    }

    pub fn socket_addr(&self) -> std::net::SocketAddr {
        self.socket_addr
    }

    pub fn method_table(&self) -> &MethodTable {
        &self.table
    }

    /// Stop accepting connections. In-flight scripts on the pump run to
    /// completion; their replies are discarded.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Bridge stopped (instance {})", self.instance_id);
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ScriptFault, ScriptOutput};

    struct HeadlessRuntime;

    impl ScriptRuntime for HeadlessRuntime {
        fn run(&self, _script: &str) -> std::result::Result<ScriptOutput, ScriptFault> {
            Ok(ScriptOutput::default())
        }

        fn ui_available(&self) -> bool {
            false
        }
    }

    fn ephemeral_config() -> ServerConfig {
        ServerConfig {
            xmlrpc_port: 0,
            socket_port: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_binds_both_ports() {
        let server = BridgeServer::start(Arc::new(HeadlessRuntime), ephemeral_config())
            .await
            .unwrap();
        assert_ne!(server.xmlrpc_addr().port(), 0);
        assert_ne!(server.socket_addr().port(), 0);
        assert_ne!(server.xmlrpc_addr().port(), server.socket_addr().port());
    }

    #[tokio::test]
    async fn test_headless_keeps_pump() {
        let mut server = BridgeServer::start(Arc::new(HeadlessRuntime), ephemeral_config())
            .await
            .unwrap();
        // Headless: the pump thread was spawned internally.
        assert!(server.take_pump().is_none());
    }

    #[tokio::test]
    async fn test_refuses_non_loopback_bind() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            ..ephemeral_config()
        };
        let err = BridgeServer::start(Arc::new(HeadlessRuntime), config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_second_instance_refuses_to_start() {
        let first = BridgeServer::start(Arc::new(HeadlessRuntime), ephemeral_config())
            .await
            .unwrap();
        let config = ServerConfig {
            xmlrpc_port: first.xmlrpc_addr().port(),
            socket_port: 0,
            ..ServerConfig::default()
        };
        let err = BridgeServer::start(Arc::new(HeadlessRuntime), config).await;
        assert!(err.is_err());
    }
}
