//! Shared test fixtures: a scriptable mock runtime and server helpers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use freecad_bridge::runtime::{ScriptFault, ScriptOutput, ScriptRuntime};
use freecad_bridge::server::{BridgeServer, ServerConfig};

/// Runtime double that mimics the FreeCAD interpreter for the script
/// shapes the bridge emits. Records execution spans so tests can assert
/// serialization.
pub struct MockRuntime {
    pub gui_up: bool,
    /// (script, phase) pairs: phase is "start" or "end".
    pub spans: Mutex<Vec<(String, &'static str)>>,
}

impl MockRuntime {
    pub fn new(gui_up: bool) -> Self {
        Self {
            gui_up,
            spans: Mutex::new(Vec::new()),
        }
    }

    pub fn span_log(&self) -> Vec<(String, &'static str)> {
        self.spans.lock().unwrap().clone()
    }
}

impl ScriptRuntime for MockRuntime {
    fn run(&self, script: &str) -> Result<ScriptOutput, ScriptFault> {
        self.spans
            .lock()
            .unwrap()
            .push((script.to_string(), "start"));

        let result = interpret(script, self.gui_up);

        self.spans.lock().unwrap().push((script.to_string(), "end"));
        result
    }

    fn ui_available(&self) -> bool {
        self.gui_up
    }
}

/// Just enough of an interpreter for the scripts the tests send.
fn interpret(script: &str, gui_up: bool) -> Result<ScriptOutput, ScriptFault> {
    if script.contains("time.sleep(0.1)") {
        std::thread::sleep(Duration::from_millis(100));
        return Ok(ScriptOutput {
            value: Some(json!("slept")),
            ..Default::default()
        });
    }

    if script.contains("while True: pass") {
        // Bounded stand-in for an infinite loop so test processes exit.
        std::thread::sleep(Duration::from_secs(3));
        return Ok(ScriptOutput::default());
    }

    if script.contains("raise ValueError('boom')") {
        return Err(ScriptFault {
            error_type: "ValueError".to_string(),
            message: "boom".to_string(),
            traceback: Some(
                "Traceback (most recent call last):\n  File \"<mcp>\", line 1, in <module>\nValueError: boom"
                    .to_string(),
            ),
            stdout: String::new(),
            stderr: String::new(),
        });
    }

    if script.contains("print('hello')") {
        return Ok(ScriptOutput {
            value: None,
            stdout: "hello\n".to_string(),
            stderr: String::new(),
        });
    }

    if script.contains("_result_ = 1 + 2") {
        return Ok(ScriptOutput {
            value: Some(json!(3)),
            ..Default::default()
        });
    }

    if script.contains("FreeCAD.Version()") {
        return Ok(ScriptOutput {
            value: Some(json!({
                "version": "1.0.0",
                "build_date": "2024/01/01",
                "python_version": "3.11.0",
                "gui_available": gui_up,
            })),
            ..Default::default()
        });
    }

    if script.contains("listDocuments().values()") {
        return Ok(ScriptOutput {
            value: Some(json!([{
                "name": "Demo",
                "label": "Demo",
                "path": null,
                "objects": ["Box"],
                "is_modified": false,
                "active_object": "Box",
            }])),
            ..Default::default()
        });
    }

    if script.contains("FreeCAD.ActiveDocument") && script.contains("ActiveObject.Name") {
        return Ok(ScriptOutput {
            value: Some(json!(null)),
            ..Default::default()
        });
    }

    if script.contains("GetLog") {
        return Ok(ScriptOutput {
            value: Some(json!(["Msg: ready"])),
            ..Default::default()
        });
    }

    // Default: succeed with no result slot.
    Ok(ScriptOutput::default())
}

/// Start a bridge server on ephemeral loopback ports.
pub async fn start_server(gui_up: bool) -> (BridgeServer, Arc<MockRuntime>) {
    let runtime = Arc::new(MockRuntime::new(gui_up));
    let config = ServerConfig {
        xmlrpc_port: 0,
        socket_port: 0,
        default_timeout: Duration::from_secs(10),
        ..ServerConfig::default()
    };
    let server = BridgeServer::start(runtime.clone(), config)
        .await
        .expect("bridge server failed to start");
    (server, runtime)
}
