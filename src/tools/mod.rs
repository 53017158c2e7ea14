//! MCP tool implementations.
//!
//! Most tools are thin parameterized wrappers: a descriptor (name, schema,
//! UI requirement) plus a template that turns validated parameters into a
//! FreeCAD Python script. One generic [`ScriptTool`] drives them all
//! through the bridge. Tools that do not fit the script shape (raw
//! execution, connection introspection) have bespoke handlers in
//! `execution`.
//!
//! Categories:
//!
//! - `documents` - document lifecycle
//! - `execution` - raw Python execution and environment introspection
//! - `objects` - generic object manipulation
//! - `primitives` - Part primitive creation
//! - `partdesign` - sketches and PartDesign features
//! - `view` - camera, selection, screenshots (GUI-gated)
//! - `export` - import/export in exchange formats
//! - `macros` - macro management

pub mod documents;
pub mod execution;
pub mod export;
pub mod macros;
pub mod objects;
pub mod partdesign;
pub mod primitives;
pub mod view;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::bridge::BridgeClient;
use crate::error::Result;
use crate::mcp::handler::{McpHandler, ToolHandler};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};

/// Parameter type for schema generation and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Str,
    Int,
    Number,
    Bool,
    List,
    Object,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Number => "number",
            Self::Bool => "boolean",
            Self::List => "array",
            Self::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// One parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub fn with_default(
        name: &'static str,
        kind: ParamKind,
        default: Value,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            description,
        }
    }
}

/// Immutable description of one tool: everything needed to advertise it
/// and to build its script.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub requires_ui: bool,
    pub params: Vec<ParamSpec>,
    pub template: fn(&ParamValues) -> String,
}

impl ToolDescriptor {
    /// JSON schema fragment advertised over MCP.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.kind.json_type()));
            prop.insert("description".to_string(), json!(param.description));
            if let Some(default) = &param.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.to_string(), Value::Object(prop));
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Validated parameter values, with defaults applied.
#[derive(Debug)]
pub struct ParamValues {
    values: HashMap<String, Value>,
}

impl ParamValues {
    /// Validate raw arguments against the descriptor's parameter specs.
    ///
    /// Returns a human-readable description of the first violation, if
    /// any; validation failures never reach the bridge.
    pub fn validate(
        specs: &[ParamSpec],
        args: HashMap<String, Value>,
    ) -> std::result::Result<Self, String> {
        let mut values = HashMap::new();
        for spec in specs {
            match args.get(spec.name) {
                Some(Value::Null) | None => {
                    if spec.required {
                        return Err(format!("missing required parameter '{}'", spec.name));
                    }
                    if let Some(default) = &spec.default {
                        values.insert(spec.name.to_string(), default.clone());
                    }
                }
                Some(value) => {
                    if !spec.kind.accepts(value) {
                        return Err(format!(
                            "parameter '{}' must be a {}, got {}",
                            spec.name,
                            spec.kind.json_type(),
                            json_type_name(value)
                        ));
                    }
                    values.insert(spec.name.to_string(), value.clone());
                }
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> &str {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> f64 {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    pub fn i64(&self, name: &str) -> i64 {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .unwrap_or_default()
    }

    pub fn bool(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    /// Value as a Python literal, `None` when absent.
    pub fn py(&self, name: &str) -> String {
        match self.values.get(name) {
            Some(v) => crate::script::py_literal(v),
            None => "None".to_string(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Generic handler: validate, gate, build script, execute, unwrap.
pub struct ScriptTool {
    descriptor: ToolDescriptor,
    bridge: Arc<dyn BridgeClient>,
}

impl ScriptTool {
    pub fn new(descriptor: ToolDescriptor, bridge: Arc<dyn BridgeClient>) -> Self {
        Self { descriptor, bridge }
    }

    /// Run the tool and produce the caller-facing dict.
    pub async fn invoke(&self, args: HashMap<String, Value>) -> Value {
        let params = match ParamValues::validate(&self.descriptor.params, args) {
            Ok(p) => p,
            Err(violation) => return json!({ "success": false, "error": violation }),
        };

        if self.descriptor.requires_ui {
            match self.bridge.ui_available().await {
                Ok(true) => {}
                Ok(false) => {
                    return json!({
                        "success": false,
                        "error": format!("GUI not available - {}", self.descriptor.name),
                    })
                }
                Err(e) => {
                    return json!({ "success": false, "error": e.to_string() });
                }
            }
        }

        let script = (self.descriptor.template)(&params);
        match self.bridge.execute(&script, None).await {
            Ok(envelope) if envelope.success => match envelope.result {
                Some(Value::Object(dict)) => Value::Object(dict),
                _ => json!({
                    "success": false,
                    "error": "tool produced no structured result",
                }),
            },
            Ok(envelope) => json!({
                "success": false,
                "error": envelope
                    .error_message
                    .unwrap_or_else(|| "script failed".to_string()),
                "traceback": envelope.error_traceback,
            }),
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        }
    }
}

#[async_trait]
impl ToolHandler for ScriptTool {
    fn definition(&self) -> Tool {
        Tool {
            name: self.descriptor.name.to_string(),
            description: self.descriptor.description.to_string(),
            input_schema: self.descriptor.input_schema(),
        }
    }

    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<ToolResult> {
        let dict = self.invoke(arguments).await;
        let is_error = dict.get("success") == Some(&json!(false));
        Ok(ToolResult {
            content: vec![ContentBlock::Text {
                text: serde_json::to_string_pretty(&dict)?,
            }],
            is_error,
        })
    }
}

/// Every script-backed descriptor in the catalog, grouped by category.
pub fn all_descriptors() -> Vec<ToolDescriptor> {
    let mut all = Vec::new();
    all.extend(documents::descriptors());
    all.extend(objects::descriptors());
    all.extend(primitives::descriptors());
    all.extend(partdesign::descriptors());
    all.extend(view::descriptors());
    all.extend(export::descriptors());
    all.extend(macros::descriptors());
    all
}

/// Register the full tool set with the MCP handler.
pub fn register_all_tools(
    handler: &mut McpHandler,
    bridge: Arc<dyn BridgeClient>,
    config: &crate::config::Config,
) {
    for descriptor in all_descriptors() {
        handler.register(ScriptTool::new(descriptor, bridge.clone()));
    }
    execution::register(handler, bridge, config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_validation_missing_required() {
        let specs = vec![ParamSpec::required("name", ParamKind::Str, "object name")];
        let err = ParamValues::validate(&specs, HashMap::new()).unwrap_err();
        assert!(err.contains("missing required parameter 'name'"));
    }

    #[test]
    fn test_param_validation_type_mismatch() {
        let specs = vec![ParamSpec::required("length", ParamKind::Number, "mm")];
        let mut args = HashMap::new();
        args.insert("length".to_string(), json!("ten"));
        let err = ParamValues::validate(&specs, args).unwrap_err();
        assert!(err.contains("'length' must be a number"));
    }

    #[test]
    fn test_param_defaults_applied() {
        let specs = vec![ParamSpec::with_default(
            "width",
            ParamKind::Number,
            json!(10.0),
            "mm",
        )];
        let params = ParamValues::validate(&specs, HashMap::new()).unwrap();
        assert_eq!(params.f64("width"), 10.0);
    }

    #[test]
    fn test_param_null_treated_as_absent() {
        let specs = vec![ParamSpec::optional("doc", ParamKind::Str, "document")];
        let mut args = HashMap::new();
        args.insert("doc".to_string(), Value::Null);
        let params = ParamValues::validate(&specs, args).unwrap();
        assert!(params.opt_str("doc").is_none());
    }

    #[test]
    fn test_int_accepts_integers_only() {
        let specs = vec![ParamSpec::required("count", ParamKind::Int, "copies")];
        let mut args = HashMap::new();
        args.insert("count".to_string(), json!(2.5));
        assert!(ParamValues::validate(&specs, args).is_err());

        let mut args = HashMap::new();
        args.insert("count".to_string(), json!(3));
        let params = ParamValues::validate(&specs, args).unwrap();
        assert_eq!(params.i64("count"), 3);
    }

    #[test]
    fn test_input_schema_shape() {
        let descriptor = ToolDescriptor {
            name: "create_box",
            description: "Create a box",
            category: "primitives",
            requires_ui: false,
            params: vec![
                ParamSpec::required("name", ParamKind::Str, "object name"),
                ParamSpec::with_default("length", ParamKind::Number, json!(10.0), "mm"),
            ],
            template: |_| String::new(),
        };
        let schema = descriptor.input_schema();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["properties"]["name"]["type"], json!("string"));
        assert_eq!(schema["properties"]["length"]["default"], json!(10.0));
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for descriptor in all_descriptors() {
            assert!(
                seen.insert(descriptor.name),
                "duplicate tool name: {}",
                descriptor.name
            );
        }
        // 77 script tools; the execution module adds 6 bespoke handlers.
        assert_eq!(seen.len(), 77, "catalog size drifted: {}", seen.len());
    }

    #[test]
    fn test_every_gui_template_carries_guard() {
        for descriptor in all_descriptors() {
            if descriptor.requires_ui {
                let params = ParamValues::validate(
                    &descriptor
                        .params
                        .iter()
                        .filter(|p| !p.required)
                        .cloned()
                        .collect::<Vec<_>>(),
                    HashMap::new(),
                )
                .unwrap();
                let script = (descriptor.template)(&params);
                assert!(
                    script.contains("FreeCAD.GuiUp"),
                    "{} requires UI but its script has no GuiUp guard",
                    descriptor.name
                );
            }
        }
    }

    #[test]
    fn test_every_template_assigns_result_slot() {
        for descriptor in all_descriptors() {
            let optional_only: Vec<_> = descriptor
                .params
                .iter()
                .filter(|p| !p.required)
                .cloned()
                .collect();
            let params = ParamValues::validate(&optional_only, HashMap::new()).unwrap();
            let script = (descriptor.template)(&params);
            assert!(
                script.contains("_result_"),
                "{} script never assigns _result_",
                descriptor.name
            );
        }
    }
}
