//! MCP server: routes JSON-RPC requests into the tool registry.

use serde_json::{Value, json};
use std::sync::Arc;

use super::dispatch::McpMethod;
use super::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use super::tools::ToolRegistry;

/// Server name advertised during initialize.
const SERVER_NAME: &str = "memorygraph";

/// MCP server for memorygraph.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Builds the server around a tool registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one JSON-RPC request. Returns `None` for notifications,
    /// which get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let method = McpMethod::from(request.method.as_str());
        let id = request.id.clone();

        // Notifications never get a response, known or not.
        if id.is_none() {
            if !method.is_known() {
                tracing::debug!(method = %method, "ignoring unknown notification");
            }
            return None;
        }

        let response = match method {
            McpMethod::Initialize => JsonRpcResponse::success(id, self.initialize_result()),
            McpMethod::Initialized => return None,
            McpMethod::Ping => JsonRpcResponse::success(id, json!({})),
            McpMethod::ListTools => JsonRpcResponse::success(id, self.list_tools_result()),
            McpMethod::CallTool => self.call_tool(id, request.params).await,
            McpMethod::Unknown(name) => {
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(&name))
            },
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn list_tools_result(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .list_tools()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("params required"));
        };
        let Some(name) = params.get("name").and_then(Value::as_str).map(String::from) else {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params("params.name required"),
            );
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        // Handlers are synchronous (rusqlite, blocking HTTP); run them on
        // the blocking pool so the transport task stays responsive.
        let registry = Arc::clone(&self.registry);
        let result = tokio::task::spawn_blocking(move || registry.execute(&name, arguments)).await;

        match result {
            Ok(tool_result) => match serde_json::to_value(&tool_result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize tool result");
                    JsonRpcResponse::error(id, JsonRpcError::internal_error("serialization failed"))
                },
            },
            Err(e) => {
                tracing::error!(error = %e, "tool task failed");
                JsonRpcResponse::error(id, JsonRpcError::internal_error("tool execution failed"))
            },
        }
    }
}
