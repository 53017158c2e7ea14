//! Configuration for the FreeCAD MCP bridge.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default per-call script timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default XML-RPC server port.
pub const DEFAULT_XMLRPC_PORT: u16 = 9875;

/// Default JSON-RPC socket server port.
pub const DEFAULT_SOCKET_PORT: u16 = 9876;

/// Command-line arguments for the bridge server.
#[derive(Parser, Debug, Clone)]
#[command(name = "bridge-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server bridging AI assistants to a running FreeCAD instance")]
pub struct Args {
    /// Bridge mode: xmlrpc, socket, or embedded
    #[arg(short, long, default_value = "xmlrpc", env = "FREECAD_MODE")]
    pub mode: BridgeMode,

    /// FreeCAD host for socket/xmlrpc modes
    #[arg(long, default_value = "localhost", env = "FREECAD_HOST")]
    pub host: String,

    /// XML-RPC server port
    #[arg(long, default_value_t = DEFAULT_XMLRPC_PORT, env = "FREECAD_XMLRPC_PORT")]
    pub xmlrpc_port: u16,

    /// JSON-RPC socket server port
    #[arg(long, default_value_t = DEFAULT_SOCKET_PORT, env = "FREECAD_SOCKET_PORT")]
    pub socket_port: u16,

    /// Default per-call script timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, env = "FREECAD_TIMEOUT_MS")]
    pub timeout_ms: u64,

    /// Path to the FreeCAD shared library (embedded mode only)
    #[arg(long, env = "FREECAD_RUNTIME_PATH")]
    pub runtime_path: Option<PathBuf>,

    /// MCP transport: stdio or http
    #[arg(short, long, default_value = "stdio", env = "FREECAD_TRANSPORT")]
    pub transport: Transport,

    /// HTTP port (only for http transport)
    #[arg(short, long, default_value = "3000", env = "FREECAD_HTTP_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "FREECAD_DEBUG")]
    pub debug: bool,
}

/// Which bridge client connects to FreeCAD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeMode {
    #[default]
    Xmlrpc,
    Socket,
    Embedded,
}

impl BridgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xmlrpc => "xmlrpc",
            Self::Socket => "socket",
            Self::Embedded => "embedded",
        }
    }
}

/// MCP transport mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// Immutable process-level configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bridge client selection
    pub mode: BridgeMode,
    /// FreeCAD host
    pub host: String,
    /// XML-RPC port
    pub xmlrpc_port: u16,
    /// JSON-RPC socket port
    pub socket_port: u16,
    /// Default per-call script timeout
    pub timeout_ms: u64,
    /// FreeCAD shared library path (embedded mode)
    pub runtime_path: Option<PathBuf>,
    /// MCP transport mode
    pub transport: Transport,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
    /// Health-check ping interval in milliseconds
    pub health_interval_ms: u64,
    /// Connect retry budget at startup
    pub connect_retries: u32,
}

impl Config {
    /// Validate invariants that clap's type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout_ms must be positive".to_string()));
        }
        if self.xmlrpc_port == self.socket_port {
            return Err(Error::Config(format!(
                "xmlrpc_port and socket_port must differ (both {})",
                self.xmlrpc_port
            )));
        }
        Ok(())
    }

    /// XML-RPC endpoint URL for the configured host.
    pub fn xmlrpc_url(&self) -> String {
        format!("http://{}:{}", self.host, self.xmlrpc_port)
    }

    /// Socket address string for the configured host.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.socket_port)
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            mode: args.mode,
            host: args.host,
            xmlrpc_port: args.xmlrpc_port,
            socket_port: args.socket_port,
            timeout_ms: args.timeout_ms,
            runtime_path: args.runtime_path,
            transport: args.transport,
            port: args.port,
            debug: args.debug,
            health_interval_ms: 5_000,
            connect_retries: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: BridgeMode::Xmlrpc,
            host: "localhost".to_string(),
            xmlrpc_port: DEFAULT_XMLRPC_PORT,
            socket_port: DEFAULT_SOCKET_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            runtime_path: None,
            transport: Transport::Stdio,
            port: 3000,
            debug: false,
            health_interval_ms: 5_000,
            connect_retries: 5,
        }
    }
}
