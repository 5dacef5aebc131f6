//! MCP server client: handshake, tool discovery, and dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use vox_domain::tool::FunctionTool;
use vox_tools::{McpBackend, ToolError, ToolRegistry};

use crate::protocol::{self, McpToolDef};
use crate::transport::{McpServerConfig, McpTransport, StdioTransport, TransportError};

/// Errors specific to MCP operations.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP server not connected")]
    NotConnected,
}

impl From<McpError> for vox_domain::error::Error {
    fn from(error: McpError) -> Self {
        vox_domain::error::Error::Mcp(error.to_string())
    }
}

/// A connection to one MCP server over stdio.
///
/// `connect` spawns the process and performs the handshake; `list_tools`
/// discovers (and by default caches) the tool set; `call_tool` executes one.
/// The allow-list, when present, filters discovery by tool name.
pub struct McpServerStdio {
    config: Option<McpServerConfig>,
    cache_tools_list: bool,
    allowed_tools: Option<HashSet<String>>,
    transport: Mutex<Option<Arc<dyn McpTransport>>>,
    tools_cache: Mutex<Option<Vec<FunctionTool>>>,
}

impl McpServerStdio {
    pub fn new(config: McpServerConfig) -> Self {
        Self {
            config: Some(config),
            cache_tools_list: true,
            allowed_tools: None,
            transport: Mutex::new(None),
            tools_cache: Mutex::new(None),
        }
    }

    /// Build a client over an existing transport (tests, embedding).
    pub fn with_transport(transport: Arc<dyn McpTransport>) -> Self {
        Self {
            config: None,
            cache_tools_list: true,
            allowed_tools: None,
            transport: Mutex::new(Some(transport)),
            tools_cache: Mutex::new(None),
        }
    }

    /// Disable or enable the `tools/list` cache (enabled by default).
    pub fn cache_tools_list(mut self, cache: bool) -> Self {
        self.cache_tools_list = cache;
        self
    }

    /// Only expose the named tools to the registry.
    pub fn allowed_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Spawn the server (unless a transport was supplied) and perform the
    /// MCP handshake: `initialize` then `notifications/initialized`.
    pub async fn connect(&self) -> Result<(), McpError> {
        let transport: Arc<dyn McpTransport> = {
            let mut slot = self.transport.lock().await;
            match slot.as_ref() {
                Some(transport) => transport.clone(),
                None => {
                    let config = self
                        .config
                        .as_ref()
                        .ok_or_else(|| McpError::Protocol("no server config".into()))?;
                    let transport: Arc<dyn McpTransport> =
                        Arc::new(StdioTransport::spawn(config)?);
                    *slot = Some(transport.clone());
                    transport
                }
            }
        };

        match transport
            .request("initialize", Some(protocol::initialize_params()))
            .await
        {
            Ok(_) => {}
            Err(TransportError::Rejected(failure)) => {
                return Err(McpError::Protocol(format!("initialize failed: {failure}")));
            }
            Err(other) => return Err(other.into()),
        }
        tracing::debug!("MCP initialize accepted");

        transport
            .notify("notifications/initialized", None)
            .await?;
        tracing::debug!("sent notifications/initialized");

        Ok(())
    }

    async fn transport(&self) -> Result<Arc<dyn McpTransport>, McpError> {
        self.transport
            .lock()
            .await
            .as_ref()
            .cloned()
            .ok_or(McpError::NotConnected)
    }

    /// Discover the server's tools, filtered by the allow-list. Results are
    /// cached unless caching was disabled.
    pub async fn list_tools(&self) -> Result<Vec<FunctionTool>, McpError> {
        if self.cache_tools_list {
            if let Some(cached) = self.tools_cache.lock().await.as_ref() {
                return Ok(cached.clone());
            }
        }

        let transport = self.transport().await?;
        let result = transport.request("tools/list", None).await?;
        let Some(raw_tools) = result.get("tools") else {
            return Err(McpError::Protocol(
                "tools/list result carries no tools".into(),
            ));
        };
        let listed: Vec<McpToolDef> = serde_json::from_value(raw_tools.clone())
            .map_err(|e| McpError::Protocol(format!("failed to parse tools/list result: {e}")))?;

        let tools: Vec<FunctionTool> = listed
            .iter()
            .filter(|def| {
                self.allowed_tools
                    .as_ref()
                    .map_or(true, |allowed| allowed.contains(&def.name))
            })
            .map(protocol::function_tool_from_def)
            .collect();

        tracing::info!(
            discovered = listed.len(),
            exposed = tools.len(),
            "MCP tools listed"
        );

        if self.cache_tools_list {
            *self.tools_cache.lock().await = Some(tools.clone());
        }
        Ok(tools)
    }

    /// Execute one tool and return the raw `result` value.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, McpError> {
        let transport = self.transport().await?;
        if !transport.is_alive() {
            return Err(McpError::Transport(TransportError::Exited(String::new())));
        }

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments.unwrap_or_default(),
        });
        Ok(transport.request("tools/call", Some(params)).await?)
    }

    /// Discover tools and register each with the registry under its original
    /// name, routed back to this server. Returns how many were registered.
    pub async fn register_tools(
        self: Arc<Self>,
        registry: &mut ToolRegistry,
    ) -> Result<usize, McpError> {
        let tools = self.list_tools().await?;
        let count = tools.len();
        for tool in tools {
            let name = tool.name.clone();
            if let Err(error) = registry.register_mcp(tool, self.clone()) {
                tracing::warn!(tool = %name, %error, "skipping MCP tool");
            }
        }
        Ok(count)
    }

    /// Terminate the server process and wait for it.
    pub async fn cleanup(&self) {
        if let Some(transport) = self.transport.lock().await.take() {
            tracing::info!("shutting down MCP server");
            transport.shutdown().await;
        }
    }
}

#[async_trait]
impl McpBackend for McpServerStdio {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        McpServerStdio::call_tool(self, name, Some(arguments))
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
