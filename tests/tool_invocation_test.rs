//! Tool-layer behavior: validation, GUI gating, envelope unwrapping, and
//! catalog consistency, against a stub bridge that records traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use freecad_bridge::bridge::{BridgeClient, ConnectionState, DocumentInfo, VersionInfo};
use freecad_bridge::config::Config;
use freecad_bridge::engine::ExecutionResult;
use freecad_bridge::error::Result;
use freecad_bridge::mcp::handler::McpHandler;
use freecad_bridge::mcp::prompts::PromptRegistry;
use freecad_bridge::mcp::resources::ResourceRegistry;
use freecad_bridge::tools::{self, ScriptTool};

/// Bridge double: configurable GUI flag, records every executed script.
struct StubBridge {
    gui_up: bool,
    scripts: Mutex<Vec<String>>,
    execute_count: AtomicUsize,
}

impl StubBridge {
    fn new(gui_up: bool) -> Self {
        Self {
            gui_up,
            scripts: Mutex::new(Vec::new()),
            execute_count: AtomicUsize::new(0),
        }
    }
}

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

    async fn execute(&self, script: &str, _timeout_ms: Option<u64>) -> Result<ExecutionResult> {
        self.execute_count.fetch_add(1, Ordering::SeqCst);
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(ExecutionResult {
            success: true,
            result: Some(json!({ "success": true, "name": "Box" })),
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
            gui_available: self.gui_up,
        })
    }

    async fn ui_available(&self) -> Result<bool> {
        Ok(self.gui_up)
    }

    fn mode(&self) -> &'static str {
        "stub"
    }
}

fn descriptor(name: &str) -> freecad_bridge::tools::ToolDescriptor {
    tools::all_descriptors()
        .into_iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("no such tool: {name}"))
}

#[tokio::test]
async fn test_ui_tool_gated_when_headless() {
    let bridge = Arc::new(StubBridge::new(false));
    let tool = ScriptTool::new(descriptor("get_screenshot"), bridge.clone());

    let dict = tool.invoke(HashMap::new()).await;
    assert_eq!(dict["success"], json!(false));
    assert!(dict["error"]
        .as_str()
        .unwrap()
        .contains("GUI not available"));
    // The bridge must not have executed anything.
    assert_eq!(bridge.execute_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ui_tool_runs_when_gui_up() {
    let bridge = Arc::new(StubBridge::new(true));
    let tool = ScriptTool::new(descriptor("get_screenshot"), bridge.clone());

    let dict = tool.invoke(HashMap::new()).await;
    assert_eq!(dict["success"], json!(true));
    assert_eq!(bridge.execute_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_validation_failure_skips_bridge() {
    let bridge = Arc::new(StubBridge::new(true));
    let tool = ScriptTool::new(descriptor("open_document"), bridge.clone());

    // Missing required `path`.
    let dict = tool.invoke(HashMap::new()).await;
    assert_eq!(dict["success"], json!(false));
    assert!(dict["error"].as_str().unwrap().contains("path"));
    assert_eq!(bridge.execute_count.load(Ordering::SeqCst), 0);

    // Wrong type for `path`.
    let mut args = HashMap::new();
    args.insert("path".to_string(), json!(42));
    let dict = tool.invoke(args).await;
    assert_eq!(dict["success"], json!(false));
    assert_eq!(bridge.execute_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_structured_result_passes_through_verbatim() {
    let bridge = Arc::new(StubBridge::new(true));
    let tool = ScriptTool::new(descriptor("create_box"), bridge.clone());

    let dict = tool.invoke(HashMap::new()).await;
    assert_eq!(dict, json!({ "success": true, "name": "Box" }));
}

#[tokio::test]
async fn test_hostile_string_param_is_literal_in_script() {
    let bridge = Arc::new(StubBridge::new(true));
    let tool = ScriptTool::new(descriptor("create_document"), bridge.clone());

    let mut args = HashMap::new();
    args.insert("name".to_string(), json!("foo'); bar()"));
    tool.invoke(args).await;

    let scripts = bridge.scripts.lock().unwrap();
    let script = scripts.last().unwrap();
    // The payload must appear only inside a quoted literal.
    assert!(script.contains(r#"newDocument("foo'); bar()")"#));
}

#[tokio::test]
async fn test_capabilities_catalog_matches_registries() {
    let bridge: Arc<dyn BridgeClient> = Arc::new(StubBridge::new(false));
    let config = Config::default();

    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, bridge.clone(), &config);
    let handler = Arc::new(handler);
    let prompts = Arc::new(PromptRegistry::new());
    let registry = ResourceRegistry::new(bridge, handler.clone(), prompts.clone());

    let capabilities = registry.capabilities();

    // Catalog tools == registered tools, both directions.
    let catalog_names: std::collections::HashSet<String> = capabilities["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    let registered: std::collections::HashSet<String> = handler
        .list_tools()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(catalog_names, registered);
    assert_eq!(capabilities["tool_count"], json!(registered.len()));

    // Every advertised resource URI is listed, capabilities included.
    let resource_uris: Vec<&str> = capabilities["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap())
        .collect();
    assert!(resource_uris.contains(&"freecad://capabilities"));

    // Prompts too.
    assert_eq!(
        capabilities["prompts"].as_array().unwrap().len(),
        prompts.count()
    );
}

#[tokio::test]
async fn test_full_registry_size() {
    let bridge: Arc<dyn BridgeClient> = Arc::new(StubBridge::new(false));
    let mut handler = McpHandler::new();
    tools::register_all_tools(&mut handler, bridge, &Config::default());
    // 77 script tools plus the 6 bespoke execution tools.
    assert_eq!(handler.tool_count(), 83);
    assert!(handler.has_tool("execute_python"));
    assert!(handler.has_tool("create_box"));
    assert!(handler.has_tool("get_screenshot"));
    assert!(handler.has_tool("export_step"));
    assert!(handler.has_tool("run_macro"));
    assert!(handler.has_tool("get_console_output"));
    assert!(handler.has_tool("get_console_log"));
    assert!(handler.has_tool("groove_sketch"));
    assert!(handler.has_tool("add_sketch_point"));
    assert!(handler.has_tool("create_macro_from_template"));
    assert!(handler.has_tool("insert_part_from_library"));
    assert!(handler.has_tool("list_parts_library"));
    assert!(handler.has_tool("recompute"));
}
