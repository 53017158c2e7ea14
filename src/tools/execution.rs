//! Raw execution and environment introspection tools.
//!
//! These do not fit the script-template shape: `execute_python` forwards
//! caller code verbatim and returns the whole envelope, and the
//! introspection tools read client state without touching FreeCAD.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::bridge::BridgeClient;
use crate::config::Config;
use crate::error::Result;
use crate::mcp::handler::{get_string_arg, McpHandler, ToolHandler};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

pub fn register(handler: &mut McpHandler, bridge: Arc<dyn BridgeClient>, config: &Config) {
    handler.register(ExecutePythonTool {
        bridge: bridge.clone(),
    });
    handler.register(GetVersionTool {
        bridge: bridge.clone(),
    });
    handler.register(GetConsoleOutputTool {
        bridge: bridge.clone(),
    });
    handler.register(GetConsoleLogTool {
        bridge: bridge.clone(),
    });
    handler.register(GetConnectionStatusTool { bridge });
    handler.register(GetEnvironmentTool {
        config: config.clone(),
    });
}

fn dict_result(dict: Value) -> Result<ToolResult> {
    let is_error = dict.get("success") == Some(&json!(false));
    Ok(ToolResult {
        content: vec![ContentBlock::Text {
            text: serde_json::to_string_pretty(&dict)?,
        }],
        is_error,
    })
}

/// Full Python console access.
pub struct ExecutePythonTool {
    bridge: Arc<dyn BridgeClient>,
}

#[async_trait]
impl ToolHandler for ExecutePythonTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "execute_python".to_string(),
            description: "Execute Python code in FreeCAD's interpreter. Assign to `_result_` \
                          to return a value; FreeCAD, App, FreeCADGui and Gui are in scope."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Python code to execute"
                    },
                    "timeout_ms": {
                        "type": "integer",
                        "description": "Maximum execution time in milliseconds (default 30000)"
                    }
                },
                "required": ["code"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let code = match get_string_arg(&args, "code") {
            Ok(code) => code,
            Err(e) => return dict_result(json!({ "success": false, "error": e.to_string() })),
        };
        let timeout_ms = args.get("timeout_ms").and_then(Value::as_u64);

        match self.bridge.execute(&code, timeout_ms).await {
            Ok(envelope) => dict_result(serde_json::to_value(envelope)?),
            Err(e) => dict_result(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

/// FreeCAD version report.
pub struct GetVersionTool {
    bridge: Arc<dyn BridgeClient>,
}

#[async_trait]
impl ToolHandler for GetVersionTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_freecad_version".to_string(),
            description: "Get the FreeCAD version, build date and GUI availability.".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
        match self.bridge.get_version().await {
            Ok(version) => dict_result(json!({
                "success": true,
                "version": version.version,
                "build_date": version.build_date,
                "python_version": version.python_version,
                "gui_available": version.gui_available,
            })),
            Err(e) => dict_result(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

/// Raw console output: the trailing lines, nothing else.
pub struct GetConsoleOutputTool {
    bridge: Arc<dyn BridgeClient>,
}

#[async_trait]
impl ToolHandler for GetConsoleOutputTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_console_output".to_string(),
            description: "Get recent FreeCAD console output as a list of lines, most recent last."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "integer",
                        "description": "Maximum number of lines to return (default 100)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let lines = args.get("lines").and_then(Value::as_u64).unwrap_or(100);
        match self.bridge.get_console_output(lines).await {
            Ok(output) => Ok(ToolResult {
                content: vec![ContentBlock::Text {
                    text: serde_json::to_string_pretty(&output)?,
                }],
                is_error: false,
            }),
            Err(e) => dict_result(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

/// Classified console log: messages split out into warnings and errors.
pub struct GetConsoleLogTool {
    bridge: Arc<dyn BridgeClient>,
}

#[async_trait]
impl ToolHandler for GetConsoleLogTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_console_log".to_string(),
            description: "Get recent console output classified into messages, warnings and errors."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "integer",
                        "description": "Maximum number of lines to return (default 50)"
                    }
                }
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let lines = args.get("lines").and_then(Value::as_u64).unwrap_or(50);
        match self.bridge.get_console_output(lines).await {
            Ok(output) => {
                let warnings: Vec<String> = output
                    .iter()
                    .filter(|line| line.to_lowercase().contains("warning"))
                    .cloned()
                    .collect();
                let errors: Vec<String> = output
                    .iter()
                    .filter(|line| line.to_lowercase().contains("error"))
                    .cloned()
                    .collect();
                dict_result(json!({
                    "messages": output,
                    "warnings": warnings,
                    "errors": errors,
                }))
            }
            Err(e) => dict_result(json!({ "success": false, "error": e.to_string() })),
        }
    }
}

/// Bridge connection diagnostics.
pub struct GetConnectionStatusTool {
    bridge: Arc<dyn BridgeClient>,
}

#[async_trait]
impl ToolHandler for GetConnectionStatusTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_connection_status".to_string(),
            description: "Report bridge mode, connection state, ping latency and FreeCAD version."
                .to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
        let state = self.bridge.state();
        let mut status = json!({
            "success": true,
            "mode": self.bridge.mode(),
            "state": state,
        });

        if self.bridge.is_connected().await {
            let start = Instant::now();
            match self.bridge.ping().await {
                Ok(()) => {
                    status["ping_ms"] = json!(start.elapsed().as_secs_f64() * 1000.0);
                }
                Err(e) => {
                    status["ping_error"] = json!(e.to_string());
                }
            }
            if let Ok(version) = self.bridge.get_version().await {
                status["freecad_version"] = json!(version.version);
                status["gui_available"] = json!(version.gui_available);
            }
        }

        dict_result(status)
    }
}

/// Adapter-side configuration, for debugging client setups.
pub struct GetEnvironmentTool {
    config: Config,
}

#[async_trait]
impl ToolHandler for GetEnvironmentTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "get_mcp_server_environment".to_string(),
            description: "Report the MCP server's own version and bridge configuration.".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _args: HashMap<String, Value>) -> Result<ToolResult> {
        dict_result(json!({
            "success": true,
            "server_version": crate::VERSION,
            "mode": self.config.mode.as_str(),
            "host": self.config.host,
            "xmlrpc_port": self.config.xmlrpc_port,
            "socket_port": self.config.socket_port,
            "timeout_ms": self.config.timeout_ms,
            "transport": self.config.transport,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ConnectionState, DocumentInfo, VersionInfo};
    use crate::engine::ExecutionResult;
    use crate::error::Error;

    /// Minimal test double for the bridge.
    struct StubBridge {
        connected: bool,
    }

    #[async_trait]
    impl BridgeClient for StubBridge {
        async fn connect(&self) -> crate::error::Result<()> {
            Ok(())
        }

        async fn disconnect(&self) {}

        fn state(&self) -> ConnectionState {
            if self.connected {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            }
        }

        async fn ping(&self) -> crate::error::Result<()> {
            Ok(())
        }

        async fn execute(
            &self,
            script: &str,
            _timeout_ms: Option<u64>,
        ) -> crate::error::Result<ExecutionResult> {
            if !self.connected {
                return Err(Error::NotConnected("stub".to_string()));
            }
            Ok(ExecutionResult {
                success: true,
                result: Some(json!(script.len())),
                stdout: String::new(),
                stderr: String::new(),
                execution_time_ms: 0.5,
                error_type: None,
                error_message: None,
                error_traceback: None,
            })
        }

        async fn get_documents(&self) -> crate::error::Result<Vec<DocumentInfo>> {
            Ok(Vec::new())
        }

        async fn get_active_document(&self) -> crate::error::Result<Option<DocumentInfo>> {
            Ok(None)
        }

        async fn get_object(&self, _doc: Option<&str>, _name: &str) -> crate::error::Result<Value> {
            Ok(Value::Null)
        }

        async fn get_console_output(&self, _lines: u64) -> crate::error::Result<Vec<String>> {
            Ok(vec![
                "Msg: recompute done".to_string(),
                "Warning: sketch under-constrained".to_string(),
                "Error: recompute failed for Pad".to_string(),
            ])
        }

        async fn get_version(&self) -> crate::error::Result<VersionInfo> {
            Ok(VersionInfo {
                version: "1.0.0".to_string(),
                build_date: None,
                python_version: None,
                gui_available: false,
            })
        }

        async fn ui_available(&self) -> crate::error::Result<bool> {
            Ok(false)
        }

        fn mode(&self) -> &'static str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_execute_python_returns_envelope() {
        let tool = ExecutePythonTool {
            bridge: Arc::new(StubBridge { connected: true }),
        };
        let mut args = HashMap::new();
        args.insert("code".to_string(), json!("_result_ = 1"));
        let result = tool.execute(args).await.unwrap();
        assert!(!result.is_error);
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        let dict: Value = serde_json::from_str(text).unwrap();
        assert_eq!(dict["success"], json!(true));
    }

    #[tokio::test]
    async fn test_execute_python_missing_code_is_local_failure() {
        let tool = ExecutePythonTool {
            bridge: Arc::new(StubBridge { connected: true }),
        };
        let result = tool.execute(HashMap::new()).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_execute_python_not_connected() {
        let tool = ExecutePythonTool {
            bridge: Arc::new(StubBridge { connected: false }),
        };
        let mut args = HashMap::new();
        args.insert("code".to_string(), json!("_result_ = 1"));
        let result = tool.execute(args).await.unwrap();
        assert!(result.is_error);
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        assert!(text.contains("Not connected"));
    }

    #[tokio::test]
    async fn test_get_console_output_returns_bare_lines() {
        let tool = GetConsoleOutputTool {
            bridge: Arc::new(StubBridge { connected: true }),
        };
        let result = tool.execute(HashMap::new()).await.unwrap();
        assert!(!result.is_error);
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        // Shape is a plain list of lines, not a dict.
        let lines: Vec<String> = serde_json::from_str(text).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Msg:"));
    }

    #[tokio::test]
    async fn test_get_console_log_classifies_lines() {
        let tool = GetConsoleLogTool {
            bridge: Arc::new(StubBridge { connected: true }),
        };
        let result = tool.execute(HashMap::new()).await.unwrap();
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        let dict: Value = serde_json::from_str(text).unwrap();
        assert_eq!(dict["messages"].as_array().unwrap().len(), 3);
        assert_eq!(dict["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(dict["errors"].as_array().unwrap().len(), 1);
        assert!(dict["warnings"][0]
            .as_str()
            .unwrap()
            .contains("under-constrained"));
    }

    #[tokio::test]
    async fn test_connection_status_disconnected() {
        let tool = GetConnectionStatusTool {
            bridge: Arc::new(StubBridge { connected: false }),
        };
        let result = tool.execute(HashMap::new()).await.unwrap();
        let ContentBlock::Text { text } = &result.content[0] else {
            panic!("expected text content");
        };
        let dict: Value = serde_json::from_str(text).unwrap();
        assert_eq!(dict["state"], json!("disconnected"));
        assert!(dict.get("ping_ms").is_none());
    }
}
