//! Seam between the registry and MCP servers.
//!
//! The registry only needs "call this tool name with these arguments on
//! whatever owns it" — the MCP client crate implements this trait for its
//! stdio server, keeping the dependency arrow pointing the right way.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::registry::ToolError;

/// Something that can execute a remotely discovered tool.
#[async_trait]
pub trait McpBackend: Send + Sync {
    /// Invoke `name` with the given argument object; returns the raw
    /// `result` value from the server.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>)
        -> Result<Value, ToolError>;
}
