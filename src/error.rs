//! Error types for the FreeCAD MCP bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Symbolic error tags carried on wire envelopes and MCP error messages.
///
/// Every error that crosses a transport boundary is classified into one of
/// these kinds; the first line of any user-visible message encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    ConfigInvalid,
    NotConnected,
    ConnectionLost,
    Timeout,
    Overloaded,
    UIUnavailable,
    ScriptError,
    ProtocolError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "ConfigInvalid",
            Self::NotConnected => "NotConnected",
            Self::ConnectionLost => "ConnectionLost",
            Self::Timeout => "Timeout",
            Self::Overloaded => "Overloaded",
            Self::UIUnavailable => "UIUnavailable",
            Self::ScriptError => "ScriptError",
            Self::ProtocolError => "ProtocolError",
            Self::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the bridge.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Configuration =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== Connection lifecycle =====
    #[error("Not connected to FreeCAD (mode: {0})")]
    NotConnected(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Connection refused at {0}")]
    ConnectionRefused(String),

    // ===== Execution =====
    #[error("Execution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Dispatcher queue full ({capacity} pending requests)")]
    Overloaded { capacity: usize },

    #[error("GUI not available: {0}")]
    UiUnavailable(String),

    #[error("Script error ({error_type}): {message}")]
    Script {
        error_type: String,
        message: String,
        traceback: Option<String>,
    },

    // ===== Protocol =====
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    // ===== Transport plumbing =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // ===== Internal =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify into the symbolic wire tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::ConfigInvalid,
            Self::NotConnected(_) => ErrorKind::NotConnected,
            Self::ConnectionLost(_) | Self::ConnectionRefused(_) => ErrorKind::ConnectionLost,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Overloaded { .. } => ErrorKind::Overloaded,
            Self::UiUnavailable(_) => ErrorKind::UIUnavailable,
            Self::Script { .. } => ErrorKind::ScriptError,
            Self::Protocol(_) | Self::McpProtocol(_) | Self::Json(_) => ErrorKind::ProtocolError,
            Self::ToolNotFound(_) | Self::InvalidToolArguments(_) | Self::ResourceNotFound(_) => {
                ErrorKind::ProtocolError
            }
            Self::Http(e) if e.is_connect() => ErrorKind::ConnectionLost,
            Self::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Io(_) | Self::Http(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error is transient enough to retry the connection.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused(_) | Self::ConnectionLost(_) | Self::Timeout { .. } | Self::Io(_)
        ) || matches!(self, Self::Http(e) if e.is_connect() || e.is_timeout())
    }

    /// Process exit code for startup failures (see CLI contract).
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::ConfigInvalid => 1,
            ErrorKind::NotConnected | ErrorKind::ConnectionLost => 2,
            _ => 3,
        }
    }
}
