//! MCP server implementation.
//!
//! Exposes the memory graph over the Model Context Protocol: JSON-RPC 2.0
//! over stdio, a typed method dispatcher, and a tool registry with one
//! handler per tool. The protocol layer knows nothing about storage.

mod dispatch;
mod protocol;
mod server;
mod stdio;
mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use protocol::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
pub use server::McpServer;
pub use stdio::StdioTransport;
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
