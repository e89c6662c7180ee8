//! MCP (Model Context Protocol) server library.
//!
//! This crate provides the wire types and a line-delimited JSON-RPC loop for
//! serving tools and UI resources over stdio.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{
//!     CallToolParams, CallToolResult, Handler, JsonRpcError, ReadResourceResult, Resource,
//!     Server, ServerInfo, Tool,
//! };
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     fn server_info(&self) -> ServerInfo {
//!         ServerInfo::new("echo", "0.1.0")
//!     }
//!
//!     fn list_tools(&self) -> Vec<Tool> {
//!         Vec::new()
//!     }
//!
//!     async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
//!         Err(JsonRpcError::invalid_params(format!("unknown tool: {}", params.name)))
//!     }
//!
//!     fn list_resources(&self) -> Vec<Resource> {
//!         Vec::new()
//!     }
//!
//!     async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, JsonRpcError> {
//!         Err(JsonRpcError::resource_not_found(uri))
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! Server::new(Echo).serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListResourcesResult, ListToolsResult, ReadResourceParams,
    ReadResourceResult, RequestId, Resource, ResourceContents, ResourcesCapability,
    ServerCapabilities, ServerInfo, Tool, ToolContent, ToolsCapability,
};
pub use server::{Handler, MAX_MESSAGE_SIZE, PROTOCOL_VERSION, Server};
