//! The bridge method table, shared by both wire servers.
//!
//! Each transport adapts frames to [`MethodTable::dispatch`]; the handlers
//! themselves exist exactly once. Non-`execute` methods are purpose-built
//! scripts run through the execution engine, so they serialize on the UI
//! thread like everything else.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::engine::ExecutionEngine;
use crate::error::{Error, Result};

/// Script behind `get_documents`.
const LIST_DOCUMENTS_SCRIPT: &str = r#"_result_ = []
for doc in FreeCAD.listDocuments().values():
    _result_.append({
        "name": doc.Name,
        "label": doc.Label,
        "path": doc.FileName or None,
        "objects": [obj.Name for obj in doc.Objects],
        "is_modified": doc.Modified if hasattr(doc, "Modified") else False,
        "active_object": doc.ActiveObject.Name if doc.ActiveObject else None,
    })
"#;

/// Script behind `get_active_document`.
const ACTIVE_DOCUMENT_SCRIPT: &str = r#"doc = FreeCAD.ActiveDocument
if doc:
    _result_ = {
        "name": doc.Name,
        "label": doc.Label,
        "path": doc.FileName or None,
        "objects": [obj.Name for obj in doc.Objects],
        "is_modified": doc.Modified if hasattr(doc, "Modified") else False,
        "active_object": doc.ActiveObject.Name if doc.ActiveObject else None,
    }
else:
    _result_ = None
"#;

/// Script behind `get_version`.
const VERSION_SCRIPT: &str = r#"import sys
_result_ = {
    "version": ".".join(str(x) for x in FreeCAD.Version()[:3]),
    "build_date": FreeCAD.Version()[3] if len(FreeCAD.Version()) > 3 else "unknown",
    "python_version": sys.version,
    "gui_available": FreeCAD.GuiUp,
}
"#;

fn get_object_script(doc: Option<&str>, name: &str) -> String {
    format!(
        r#"{resolve}if doc is not None:
    obj = doc.getObject({name})
    if obj is None:
        raise ValueError("Object not found: %s" % {name})
    props = {{}}
    for prop in obj.PropertiesList:
        try:
            val = getattr(obj, prop)
            if hasattr(val, '__class__') and val.__class__.__module__ != 'builtins':
                val = str(val)
            props[prop] = val
        except Exception:
            props[prop] = "<unreadable>"
    shape_info = None
    if hasattr(obj, "Shape"):
        shape = obj.Shape
        shape_info = {{
            "shape_type": shape.ShapeType,
            "volume": shape.Volume if hasattr(shape, "Volume") else None,
            "area": shape.Area if hasattr(shape, "Area") else None,
            "is_valid": shape.isValid(),
            "vertex_count": len(shape.Vertexes) if hasattr(shape, "Vertexes") else 0,
            "edge_count": len(shape.Edges) if hasattr(shape, "Edges") else 0,
            "face_count": len(shape.Faces) if hasattr(shape, "Faces") else 0,
        }}
    _result_ = {{
        "name": obj.Name,
        "label": obj.Label,
        "type_id": obj.TypeId,
        "properties": props,
        "shape_info": shape_info,
        "children": [c.Name for c in obj.OutList] if hasattr(obj, "OutList") else [],
        "parents": [p.Name for p in obj.InList] if hasattr(obj, "InList") else [],
    }}
"#,
        resolve = crate::script::resolve_document(doc),
        name = crate::script::py_str(name),
    )
}

fn console_output_script(lines: u64) -> String {
    format!(
        r#"output_lines = []
if hasattr(FreeCAD, 'Console'):
    console = FreeCAD.Console
    if hasattr(console, 'GetLog'):
        log = console.GetLog()
        if log:
            output_lines = log.split('\n')[-{lines}:]
_result_ = output_lines
"#
    )
}

/// Shared counters surfaced by `get_status` and the workbench status bar.
#[derive(Debug, Default)]
pub struct RequestStats {
    count: AtomicU64,
}

impl RequestStats {
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// The method table: engine handle plus server identity.
#[derive(Clone)]
pub struct MethodTable {
    engine: ExecutionEngine,
    instance_id: String,
    xmlrpc_port: u16,
    socket_port: u16,
    stats: Arc<RequestStats>,
}

impl MethodTable {
    pub fn new(
        engine: ExecutionEngine,
        instance_id: String,
        xmlrpc_port: u16,
        socket_port: u16,
    ) -> Self {
        Self {
            engine,
            instance_id,
            xmlrpc_port,
            socket_port,
            stats: Arc::new(RequestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RequestStats> {
        self.stats.clone()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Dispatch a method by name with named parameters.
    ///
    /// `execute` always succeeds at this level: script outcomes travel
    /// inside the returned envelope. The `get_*` methods unwrap their
    /// envelope and surface script failures as `Err`, which each transport
    /// encodes in its own error shape.
    pub async fn dispatch(&self, method: &str, params: &Value) -> Result<Value> {
        self.stats.record();

        match method {
            "ping" => Ok(json!("pong")),
            "get_instance_id" => Ok(json!({ "instance_id": self.instance_id })),
            "get_status" => Ok(json!({
                "running": true,
                "instance_id": self.instance_id,
                "xmlrpc_port": self.xmlrpc_port,
                "socket_port": self.socket_port,
                "request_count": self.stats.count(),
                "headless": !self.engine.ui_available(),
            })),
            "ui_available" => Ok(json!(self.engine.ui_available())),
            "execute" => {
                let script = params
                    .get("script")
                    .or_else(|| params.get("code"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::Protocol("execute requires a 'script' parameter".to_string())
                    })?;
                let timeout = params
                    .get("timeout_ms")
                    .and_then(Value::as_u64)
                    .map(Duration::from_millis);
                let envelope = self.engine.execute(script, timeout).await;
                Ok(serde_json::to_value(envelope)?)
            }
            "get_documents" => self.run_unwrapped(LIST_DOCUMENTS_SCRIPT).await,
            "get_active_document" => self.run_unwrapped(ACTIVE_DOCUMENT_SCRIPT).await,
            "get_version" => self.run_unwrapped(VERSION_SCRIPT).await,
            "get_object" => {
                let doc = params.get("doc").and_then(Value::as_str);
                let name = params
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::Protocol("get_object requires a 'name' parameter".to_string())
                    })?;
                self.run_unwrapped(&get_object_script(doc, name)).await
            }
            "get_console_output" => {
                let lines = params.get("lines").and_then(Value::as_u64).unwrap_or(100);
                self.run_unwrapped(&console_output_script(lines)).await
            }
            other => Err(Error::Protocol(format!("Method not found: {other}"))),
        }
    }

    /// Map XML-RPC positional parameters onto the named shape.
    pub fn positional_to_named(method: &str, params: &[Value]) -> Value {
        let mut map = serde_json::Map::new();
        let names: &[&str] = match method {
            "execute" => &["script", "timeout_ms"],
            "get_object" => &["doc", "name"],
            "get_console_output" => &["lines"],
            _ => &[],
        };
        for (name, value) in names.iter().zip(params.iter()) {
            map.insert((*name).to_string(), value.clone());
        }
        Value::Object(map)
    }

    /// Run a purpose-built script and unwrap its envelope.
    async fn run_unwrapped(&self, script: &str) -> Result<Value> {
        let envelope = self.engine.execute(script, None).await;
        if envelope.success {
            Ok(envelope.result.unwrap_or(Value::Null))
        } else {
            Err(Error::Script {
                error_type: envelope
                    .error_type
                    .unwrap_or_else(|| "Internal".to_string()),
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "script failed without message".to_string()),
                traceback: envelope.error_traceback,
            })
        }
    }
}
