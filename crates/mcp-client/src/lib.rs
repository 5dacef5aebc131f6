//! `vox-mcp-client` — MCP (Model Context Protocol) client for VoxAgent.
//!
//! This crate provides:
//! - The wire format: outbound JSON-RPC 2.0 frames, a classifier for inbound
//!   server lines, and the conversion of discovered tools into the
//!   registry's function-tool shape.
//! - A stdio transport whose pipe state lives behind one exchange lock, so
//!   request/reply cycles over the shared child pipes are atomic.
//! - [`McpServerStdio`], which performs the MCP handshake, discovers tools
//!   (with caching and an optional allow-list), and executes `tools/call` on
//!   behalf of the tool registry.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vox_mcp_client::{McpServerConfig, McpServerStdio};
//!
//! let server = Arc::new(McpServerStdio::new(
//!     McpServerConfig::new("uv").args(["run", "my_mcp_server.py"]),
//! ));
//! server.connect().await?;
//! server.register_tools(&mut registry).await?;
//! ```

pub mod client;
pub mod protocol;
pub mod transport;

// Re-exports for convenience.
pub use client::{McpError, McpServerStdio};
pub use protocol::{function_tool_from_def, InboundFrame, McpToolDef, OutboundFrame, RpcFailure};
pub use transport::{McpServerConfig, McpTransport, StdioTransport, TransportError};
