//! FreeCAD MCP bridge.
//!
//! Exposes a running FreeCAD instance to Model Context Protocol clients
//! as a catalog of typed tools, resources and prompts. The crate has two
//! halves:
//!
//! - **CAD side** (`runtime`, `dispatch`, `engine`, `server`): embedded in
//!   the FreeCAD process. A [`server::BridgeServer`] accepts XML-RPC and
//!   newline-JSON connections and funnels every script onto the UI thread
//!   through a single dispatcher, because FreeCAD's document model is
//!   single-threaded.
//! - **Client side** (`bridge`, `tools`, `mcp`, `http`): the `bridge-server`
//!   binary. Speaks MCP over stdio or HTTP and forwards tool invocations
//!   to FreeCAD through one of three interchangeable bridge clients
//!   (XML-RPC, socket, embedded).
//!
//! Scripts cannot be interrupted once started: a timed-out request is
//! abandoned, not cancelled, and its result is discarded. This is a
//! deliberate trade against corrupting the document model.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod http;
pub mod mcp;
pub mod retry;
pub mod runtime;
pub mod script;
pub mod server;
pub mod tools;
pub mod wire;

pub use error::{Error, ErrorKind, Result};

/// Crate version, advertised in MCP server info and the status resource.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
