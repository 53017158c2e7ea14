//! MCP server: routes requests from a transport to the registries.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::mcp::handler::McpHandler;
use crate::mcp::prompts::{ListPromptsResult, PromptRegistry};
use crate::mcp::protocol::*;
use crate::mcp::resources::ResourceRegistry;
use crate::mcp::transport::{Message, Transport};

/// MCP server.
pub struct McpServer {
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    resources: Arc<ResourceRegistry>,
    name: String,
    version: String,
}

impl McpServer {
    pub fn new(
        handler: Arc<McpHandler>,
        prompts: Arc<PromptRegistry>,
        resources: Arc<ResourceRegistry>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            prompts,
            resources,
            name: name.into(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Run the request loop until the transport closes.
    pub async fn run<T: Transport>(&self, mut transport: T) -> Result<()> {
        info!("Starting MCP server: {} v{}", self.name, self.version);

        let (mut incoming, outgoing) = transport.start().await?;

        while let Some(msg) = incoming.recv().await {
            match msg {
                Message::Request(req) => {
                    let response = self.handle_request(req).await;
                    if outgoing.send(Message::Response(response)).await.is_err() {
                        error!("Failed to send response");
                        break;
                    }
                }
                Message::Notification(notif) => {
                    self.handle_notification(notif).await;
                }
                Message::Response(_) => {
                    warn!("Received unexpected response");
                }
            }
        }

        transport.stop().await?;
        info!("MCP server stopped");
        Ok(())
    }

    /// Route one request and wrap the outcome in a JSON-RPC response.
    pub async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {} (id: {:?})", req.method, req.id);

        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(req.params).await,
            "prompts/list" => self.handle_list_prompts(),
            "prompts/get" => self.handle_get_prompt(req.params),
            "resources/list" => self.handle_list_resources(),
            "resources/read" => self.handle_read_resource(req.params).await,
            _ => Err(Error::McpProtocol(format!(
                "Unknown method: {}",
                req.method
            ))),
        };

        match result {
            Ok(value) => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: req.id,
                result: Some(value),
                error: None,
            },
            Err(e) => JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: req.id,
                result: None,
                error: Some(JsonRpcError {
                    code: error_code_for(&e),
                    // First line encodes the error kind for clients.
                    message: format!("{}: {}", e.kind(), e),
                    data: None,
                }),
            },
        }
    }

    async fn handle_notification(&self, notif: JsonRpcNotification) {
        debug!("Handling notification: {}", notif.method);

        match notif.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                // In-flight FreeCAD scripts cannot be interrupted safely;
                // the caller's result is simply discarded when it lands.
                if let Some(params) = notif.params {
                    debug!("Client cancelled request: {params}");
                }
            }
            _ => {
                debug!("Ignoring notification: {}", notif.method);
            }
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
                prompts: Some(PromptsCapability { list_changed: false }),
                logging: Some(LoggingCapability {}),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.handler.list_tools(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value> {
        let params: CallToolParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let handler = self
            .handler
            .get_tool(&params.name)
            .ok_or_else(|| Error::ToolNotFound(params.name.clone()))?;

        let result = handler.execute(params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_prompts(&self) -> Result<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list(),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_get_prompt(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct GetPromptParams {
            name: String,
            #[serde(default)]
            arguments: HashMap<String, String>,
        }

        let params: GetPromptParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let result = self
            .prompts
            .get(&params.name, &params.arguments)
            .ok_or_else(|| Error::McpProtocol(format!("Prompt not found: {}", params.name)))?;

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_resources(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.resources.list())?)
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct ReadParams {
            uri: String,
        }

        let params: ReadParams = params
            .ok_or_else(|| Error::InvalidToolArguments("Missing params".to_string()))
            .and_then(|v| {
                serde_json::from_value(v).map_err(|e| Error::InvalidToolArguments(e.to_string()))
            })?;

        let result = self.resources.read(&params.uri).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn error_code_for(error: &Error) -> i32 {
    match error {
        Error::ToolNotFound(_) | Error::McpProtocol(_) => error_codes::METHOD_NOT_FOUND,
        Error::InvalidToolArguments(_) => error_codes::INVALID_PARAMS,
        Error::ResourceNotFound(_) => error_codes::INVALID_PARAMS,
        _ => error_codes::INTERNAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            error_code_for(&Error::ToolNotFound("x".into())),
            error_codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            error_code_for(&Error::InvalidToolArguments("x".into())),
            error_codes::INVALID_PARAMS
        );
        assert_eq!(
            error_code_for(&Error::Internal("x".into())),
            error_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_error_message_leads_with_kind() {
        let e = Error::NotConnected("socket".to_string());
        let message = format!("{}: {}", e.kind(), e);
        assert!(message.starts_with(ErrorKind::NotConnected.as_str()));
    }
}
