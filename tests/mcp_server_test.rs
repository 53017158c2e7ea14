//! MCP request-loop tests: JSON-RPC in, JSON-RPC out, no wire involved.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use freecad_bridge::bridge::{BridgeClient, ConnectionState, DocumentInfo, VersionInfo};
use freecad_bridge::config::Config;
use freecad_bridge::engine::ExecutionResult;
use freecad_bridge::error::Result;
use freecad_bridge::mcp::handler::McpHandler;
use freecad_bridge::mcp::prompts::PromptRegistry;
use freecad_bridge::mcp::protocol::{JsonRpcRequest, RequestId, JSONRPC_VERSION};
use freecad_bridge::mcp::resources::ResourceRegistry;
use freecad_bridge::mcp::server::McpServer;
use freecad_bridge::tools;

struct StubBridge;

#[async_trait]
impl BridgeClient for StubBridge {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) {}

    fn state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, _script: &str, _timeout_ms: Option<u64>) -> Result<ExecutionResult> {
        Ok(ExecutionResult {
            success: true,
            result: Some(json!({ "success": true, "documents": [], "count": 0 })),
            stdout: String::new(),
            stderr: String::new(),
            execution_time_ms: 0.1,
            error_type: None,
            error_message: None,
            error_traceback: None,
        })
    }

    async fn get_documents(&self) -> Result<Vec<DocumentInfo>> {
        Ok(Vec::new())
    }

    async fn get_active_document(&self) -> Result<Option<DocumentInfo>> {
        Ok(None)
    }

    async fn get_object(&self, _doc: Option<&str>, _name: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn get_console_output(&self, _lines: u64) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_version(&self) -> Result<VersionInfo> {
        Ok(VersionInfo {
            version: "1.0.0".to_string(),
            build_date: None,
            python_version: None,
            gui_available: false,
        })
    }

    async fn ui_available(&self) -> Result<bool> {
        Ok(false)
    }

    fn mode(&self) -> &'static str {
        "stub"
    }
}

fn build_server() -> McpServer {
    let bridge: Arc<dyn BridgeClient> = Arc::new(StubBridge);
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, bridge.clone(), &Config::default());
    let handler = Arc::new(handler);
    let prompts = Arc::new(PromptRegistry::new());
    let resources = Arc::new(ResourceRegistry::new(bridge, handler.clone(), prompts.clone()));
    McpServer::new(handler, prompts, resources, "freecad-bridge")
}

fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: RequestId::Number(id),
        method: method.to_string(),
        params: if params.is_null() { None } else { Some(params) },
    }
}

#[tokio::test]
async fn test_initialize() {
    let server = build_server();
    let response = server
        .handle_request(request(1, "initialize", json!({})))
        .await;

    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert!(result["protocolVersion"].is_string());
    assert_eq!(result["serverInfo"]["name"], json!("freecad-bridge"));
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["capabilities"]["resources"].is_object());
    assert!(result["capabilities"]["prompts"].is_object());
}

#[tokio::test]
async fn test_tools_list() {
    let server = build_server();
    let response = server.handle_request(request(2, "tools/list", json!(null))).await;

    let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
    assert!(tools.len() >= 80);
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"create_box"));
    assert!(names.contains(&"execute_python"));
    // Every tool advertises an object schema.
    for tool in &tools {
        assert_eq!(tool["inputSchema"]["type"], json!("object"));
        assert!(tool["description"].as_str().unwrap().len() > 10);
    }
}

#[tokio::test]
async fn test_tools_call_returns_dict_content() {
    let server = build_server();
    let response = server
        .handle_request(request(
            3,
            "tools/call",
            json!({ "name": "list_documents", "arguments": {} }),
        ))
        .await;

    assert!(response.error.is_none());
    let result = response.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    let dict: Value = serde_json::from_str(text).unwrap();
    assert_eq!(dict["success"], json!(true));
}

#[tokio::test]
async fn test_tools_call_unknown_tool() {
    let server = build_server();
    let response = server
        .handle_request(request(
            4,
            "tools/call",
            json!({ "name": "explode_part", "arguments": {} }),
        ))
        .await;

    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    // First line of the message encodes the error kind.
    assert!(error.message.starts_with("ProtocolError"));
}

#[tokio::test]
async fn test_prompts_roundtrip() {
    let server = build_server();

    let response = server.handle_request(request(5, "prompts/list", json!(null))).await;
    let prompts = response.result.unwrap()["prompts"].as_array().unwrap().clone();
    assert!(prompts.len() >= 5);

    let response = server
        .handle_request(request(
            6,
            "prompts/get",
            json!({ "name": "design_part", "arguments": { "description": "a flange" } }),
        ))
        .await;
    let result = response.result.unwrap();
    let text = result["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("a flange"));
}

#[tokio::test]
async fn test_resources_list_and_read_capabilities() {
    let server = build_server();

    let response = server
        .handle_request(request(7, "resources/list", json!(null)))
        .await;
    let resources = response.result.unwrap()["resources"]
        .as_array()
        .unwrap()
        .clone();
    assert!(resources
        .iter()
        .any(|r| r["uri"] == json!("freecad://capabilities")));

    let response = server
        .handle_request(request(
            8,
            "resources/read",
            json!({ "uri": "freecad://capabilities" }),
        ))
        .await;
    let result = response.result.unwrap();
    let text = result["contents"][0]["text"].as_str().unwrap();
    let manifest: Value = serde_json::from_str(text).unwrap();
    assert!(manifest["tool_count"].as_u64().unwrap() >= 80);
}

#[tokio::test]
async fn test_resource_read_version() {
    let server = build_server();
    let response = server
        .handle_request(request(
            9,
            "resources/read",
            json!({ "uri": "freecad://version" }),
        ))
        .await;
    let result = response.result.unwrap();
    let text = result["contents"][0]["text"].as_str().unwrap();
    let version: Value = serde_json::from_str(text).unwrap();
    assert_eq!(version["version"], json!("1.0.0"));
}

#[tokio::test]
async fn test_unknown_resource_is_invalid_params() {
    let server = build_server();
    let response = server
        .handle_request(request(
            10,
            "resources/read",
            json!({ "uri": "freecad://nonsense" }),
        ))
        .await;
    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_unknown_method() {
    let server = build_server();
    let response = server
        .handle_request(request(11, "bogus/method", json!(null)))
        .await;
    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn test_ping() {
    let server = build_server();
    let response = server.handle_request(request(12, "ping", json!(null))).await;
    assert_eq!(response.result.unwrap(), json!({}));
}
