//! MCP resources: read-only introspection endpoints under `freecad://`.
//!
//! The `freecad://capabilities` resource is the authoritative discovery
//! surface; it is generated from the live registries so it can never
//! drift from what the server actually dispatches.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::bridge::BridgeClient;
use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;
use crate::mcp::prompts::PromptRegistry;
use crate::script::py_str;

/// A resource exposed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Result of resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Result of resources/read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

/// Static resource descriptors: (uri, name, description). Templated URIs
/// use `{placeholder}` segments.
const RESOURCES: &[(&str, &str, &str)] = &[
    ("freecad://version", "version", "FreeCAD version information"),
    ("freecad://status", "status", "Bridge connection status"),
    ("freecad://documents", "documents", "All open documents"),
    ("freecad://active-document", "active-document", "The active document"),
    ("freecad://documents/{name}", "document", "One document by name"),
    (
        "freecad://documents/{name}/objects",
        "document-objects",
        "Objects in one document",
    ),
    (
        "freecad://objects/{doc}/{name}",
        "object",
        "Detailed object information",
    ),
    ("freecad://workbenches", "workbenches", "Available workbenches"),
    ("freecad://macros", "macros", "Installed macros"),
    ("freecad://console", "console", "Recent console output"),
    (
        "freecad://capabilities",
        "capabilities",
        "Catalog of all tools, resources and prompts",
    ),
];

/// Resource registry backed by the bridge.
pub struct ResourceRegistry {
    bridge: Arc<dyn BridgeClient>,
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
}

impl ResourceRegistry {
    pub fn new(
        bridge: Arc<dyn BridgeClient>,
        handler: Arc<McpHandler>,
        prompts: Arc<PromptRegistry>,
    ) -> Self {
        Self {
            bridge,
            handler,
            prompts,
        }
    }

    /// List all resources, templated ones included.
    pub fn list(&self) -> ListResourcesResult {
        let resources = RESOURCES
            .iter()
            .map(|(uri, name, description)| Resource {
                uri: (*uri).to_string(),
                name: (*name).to_string(),
                description: Some((*description).to_string()),
                mime_type: Some("application/json".to_string()),
            })
            .collect();
        ListResourcesResult { resources }
    }

    /// Read one resource by URI.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult> {
        let path = uri
            .strip_prefix("freecad://")
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;

        let segments: Vec<&str> = path.split('/').collect();
        let payload = match segments.as_slice() {
            ["version"] => self.read_version().await?,
            ["status"] => self.read_status().await?,
            ["documents"] => self.read_documents().await?,
            ["active-document"] => self.read_active_document().await?,
            ["documents", name] => self.read_document(name).await?,
            ["documents", name, "objects"] => self.read_document_objects(name).await?,
            ["objects", doc, name] => self.read_object(doc, name).await?,
            ["workbenches"] => self.read_workbenches().await?,
            ["macros"] => self.read_macros().await?,
            ["console"] => self.read_console().await?,
            ["capabilities"] => self.capabilities(),
            _ => return Err(Error::ResourceNotFound(uri.to_string())),
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some("application/json".to_string()),
                text: Some(serde_json::to_string_pretty(&payload)?),
            }],
        })
    }

    /// The catalog manifest, generated from the live registries.
    pub fn capabilities(&self) -> Value {
        let tools: Vec<Value> = self
            .handler
            .list_tools()
            .into_iter()
            .map(|t| json!({ "name": t.name, "description": t.description }))
            .collect();
        let resources: Vec<Value> = RESOURCES
            .iter()
            .map(|(uri, _, description)| json!({ "uri": uri, "description": description }))
            .collect();
        let prompts: Vec<Value> = self
            .prompts
            .list()
            .into_iter()
            .map(|p| json!({ "name": p.name, "description": p.description }))
            .collect();

        json!({
            "server": { "name": "freecad-bridge", "version": crate::VERSION },
            "tool_count": tools.len(),
            "tools": tools,
            "resources": resources,
            "prompts": prompts,
        })
    }

    async fn read_version(&self) -> Result<Value> {
        let version = self.bridge.get_version().await?;
        Ok(serde_json::to_value(version)?)
    }

    async fn read_status(&self) -> Result<Value> {
        let mut status = json!({
            "mode": self.bridge.mode(),
            "state": self.bridge.state(),
        });
        if self.bridge.is_connected().await {
            if let Ok(gui) = self.bridge.ui_available().await {
                status["gui_available"] = json!(gui);
            }
            if let Ok(version) = self.bridge.get_version().await {
                status["freecad_version"] = json!(version.version);
            }
        }
        Ok(status)
    }

    async fn read_documents(&self) -> Result<Value> {
        let docs = self.bridge.get_documents().await?;
        Ok(serde_json::to_value(docs)?)
    }

    async fn read_active_document(&self) -> Result<Value> {
        let doc = self.bridge.get_active_document().await?;
        Ok(serde_json::to_value(doc)?)
    }

    async fn read_document(&self, name: &str) -> Result<Value> {
        let docs = self.bridge.get_documents().await?;
        docs.into_iter()
            .find(|d| d.name == name)
            .map(|d| serde_json::to_value(d).map_err(Error::from))
            .transpose()?
            .ok_or_else(|| Error::ResourceNotFound(format!("freecad://documents/{name}")))
    }

    async fn read_document_objects(&self, name: &str) -> Result<Value> {
        let script = format!(
            r#"name = {name}
if name not in FreeCAD.listDocuments():
    _result_ = None
else:
    doc = FreeCAD.getDocument(name)
    _result_ = [{{
        "name": obj.Name,
        "label": obj.Label,
        "type_id": obj.TypeId,
    }} for obj in doc.Objects]
"#,
            name = py_str(name),
        );
        let envelope = self.bridge.execute(&script, None).await?;
        match envelope.result {
            Some(Value::Null) | None => {
                Err(Error::ResourceNotFound(format!("freecad://documents/{name}/objects")))
            }
            Some(value) => Ok(value),
        }
    }

    async fn read_object(&self, doc: &str, name: &str) -> Result<Value> {
        self.bridge.get_object(Some(doc), name).await
    }

    async fn read_workbenches(&self) -> Result<Value> {
        let script = r#"if FreeCAD.GuiUp:
    _result_ = sorted(FreeCADGui.listWorkbenches().keys())
else:
    _result_ = ["PartWorkbench", "PartDesignWorkbench", "DraftWorkbench",
                "SketcherWorkbench", "MeshWorkbench"]
"#;
        let envelope = self.bridge.execute(script, None).await?;
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    async fn read_macros(&self) -> Result<Value> {
        let script = r#"import os
macros = []
path = FreeCAD.getUserMacroDir(True)
if os.path.isdir(path):
    for filename in sorted(os.listdir(path)):
        if filename.endswith(".FCMacro"):
            macros.append(filename[:-8])
_result_ = macros
"#;
        let envelope = self.bridge.execute(script, None).await?;
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    async fn read_console(&self) -> Result<Value> {
        let lines = self.bridge.get_console_output(100).await?;
        Ok(json!(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resource_list_includes_capabilities() {
        let uris: Vec<&str> = RESOURCES.iter().map(|(uri, _, _)| *uri).collect();
        assert!(uris.contains(&"freecad://capabilities"));
        assert!(uris.contains(&"freecad://documents/{name}"));
        // URIs must be unique.
        let mut dedup = uris.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), uris.len());
    }

    #[test]
    fn test_resource_serialization_uses_camel_case() {
        let resource = Resource {
            uri: "freecad://version".to_string(),
            name: "version".to_string(),
            description: None,
            mime_type: Some("application/json".to_string()),
        };
        let json = serde_json::to_string(&resource).unwrap();
        assert!(json.contains("\"mimeType\""));
        assert!(!json.contains("\"description\""));
    }
}
