//! `vox-tools` — the tool registry the realtime model calls into.
//!
//! Local tools are declared with a typed parameter builder that derives the
//! JSON schema advertised to the model. At call time every handler receives
//! a [`ToolContext`] (bus handle + opaque user context) — the injected
//! "special parameters" that never appear in a schema. MCP-discovered tools
//! are registered under their original names and routed to the owning server
//! through the [`McpBackend`] seam.

pub mod builtin;
pub mod context;
pub mod mcp;
pub mod registry;
pub mod schema;

pub use builtin::{default_tools, ActionResult};
pub use context::ToolContext;
pub use mcp::McpBackend;
pub use registry::{Tool, ToolBuilder, ToolError, ToolOutput, ToolRegistry};
pub use schema::{build_parameters, ParamKind, ParamSpec, ToolParam};
