//! Tool definitions, execution, and the registry.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};

use vox_domain::tool::{FunctionParameters, FunctionTool, FunctionToolKind};

use crate::context::ToolContext;
use crate::mcp::McpBackend;
use crate::schema::{build_parameters, ParamSpec, ToolParam};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Output & errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a handler hands back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Nothing to say; serialized as the literal `"Success"`.
    None,
    /// Passed through verbatim.
    Text(String),
    /// Serialized as compact JSON.
    Json(Value),
}

impl ToolOutput {
    /// Serialize for the `function_call_output` item.
    pub fn serialize(&self) -> String {
        match self {
            ToolOutput::None => "Success".into(),
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.into())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

/// Errors surfaced by registration and execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool '{0}' already registered")]
    Duplicate(String),

    #[error("missing required parameter '{param}' for tool '{tool}'")]
    MissingArgument { tool: String, param: String },

    #[error("{0}")]
    Failed(String),
}

impl From<ToolError> for vox_domain::error::Error {
    fn from(error: ToolError) -> Self {
        vox_domain::error::Error::Tool(error.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type ToolHandler = Arc<
    dyn Fn(Map<String, Value>, ToolContext) -> BoxFuture<'static, Result<ToolOutput, ToolError>>
        + Send
        + Sync,
>;

/// A registered tool: schema plus handler plus response behavior.
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
    /// Declared parameters (empty for MCP-sourced tools, whose schema
    /// arrives pre-built).
    pub params: Vec<ParamSpec>,
    /// Spoken by the model after the result arrives; falls back to the
    /// session default when unset.
    pub result_instruction: Option<String>,
    /// When set, no follow-up response is requested after the result.
    pub suppress_response: bool,
    /// Assistant chatter sent before executing a slow tool.
    pub pending_message: Option<String>,
    handler: ToolHandler,
}

impl Tool {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name, description)
    }

    /// The schema advertised in `session.tools`.
    pub fn definition(&self) -> FunctionTool {
        FunctionTool {
            kind: FunctionToolKind::Function,
            name: self.name.clone(),
            description: Some(self.description.clone()),
            parameters: self.parameters.clone(),
        }
    }

    pub async fn execute(
        &self,
        arguments: Map<String, Value>,
        context: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        (self.handler)(arguments, context).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("suppress_response", &self.suppress_response)
            .finish()
    }
}

/// Builder for local tools.
pub struct ToolBuilder {
    name: String,
    description: String,
    params: Vec<ParamSpec>,
    result_instruction: Option<String>,
    suppress_response: bool,
    pending_message: Option<String>,
}

impl ToolBuilder {
    fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            result_instruction: None,
            suppress_response: false,
            pending_message: None,
        }
    }

    /// Declare a required parameter of type `T`.
    pub fn param<T: ToolParam>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            description: Some(description.into()),
            kind: T::kind(),
            default: None,
        });
        self
    }

    /// Declare an optional parameter of type `T` with a default value.
    pub fn optional_param<T: ToolParam>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: Value,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            description: Some(description.into()),
            kind: T::kind(),
            default: Some(default),
        });
        self
    }

    pub fn result_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.result_instruction = Some(instruction.into());
        self
    }

    pub fn suppress_response(mut self) -> Self {
        self.suppress_response = true;
        self
    }

    pub fn pending_message(mut self, message: impl Into<String>) -> Self {
        self.pending_message = Some(message.into());
        self
    }

    /// Finish with an async handler.
    pub fn handler<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Map<String, Value>, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
    {
        let parameters = build_parameters(&self.params);
        Tool {
            name: self.name,
            description: self.description,
            parameters,
            params: self.params,
            result_instruction: self.result_instruction,
            suppress_response: self.suppress_response,
            pending_message: self.pending_message,
            handler: Arc::new(move |args, ctx| handler(args, ctx).boxed()),
        }
    }

    /// Finish with a blocking handler, executed on the blocking pool.
    pub fn blocking_handler<F>(self, handler: F) -> Tool
    where
        F: Fn(Map<String, Value>, ToolContext) -> Result<ToolOutput, ToolError>
            + Send
            + Sync
            + 'static,
    {
        let handler = Arc::new(handler);
        self.handler(move |args, ctx| {
            let handler = handler.clone();
            async move {
                tokio::task::spawn_blocking(move || handler(args, ctx))
                    .await
                    .map_err(|e| ToolError::Failed(format!("blocking tool panicked: {e}")))?
            }
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds every tool of a session. Effectively immutable after agent start.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in tools.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        for tool in crate::builtin::default_tools() {
            // Built-in names cannot collide in a fresh registry.
            let _ = registry.register(tool);
        }
        registry
    }

    /// Register a tool. Names are unique across the registry.
    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ToolError::Duplicate(tool.name));
        }
        tracing::debug!(tool = %tool.name, "registered tool");
        self.tools.insert(tool.name.clone(), Arc::new(tool));
        Ok(())
    }

    /// Register an MCP-discovered tool under its original name; calls route
    /// to the owning server through `backend`.
    pub fn register_mcp(
        &mut self,
        definition: FunctionTool,
        backend: Arc<dyn McpBackend>,
    ) -> Result<(), ToolError> {
        let name = definition.name.clone();
        let call_name = definition.name.clone();
        let tool = Tool {
            name: definition.name,
            description: definition.description.unwrap_or_default(),
            parameters: definition.parameters,
            params: Vec::new(),
            result_instruction: None,
            suppress_response: false,
            pending_message: None,
            handler: Arc::new(move |args, _ctx| {
                let backend = backend.clone();
                let call_name = call_name.clone();
                async move {
                    backend
                        .call_tool(&call_name, args)
                        .await
                        .map(ToolOutput::Json)
                }
                .boxed()
            }),
        };
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        tracing::debug!(tool = %name, "registered MCP tool");
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas for `session.tools`, sorted by name for a stable wire order.
    pub fn definitions(&self) -> Vec<FunctionTool> {
        let mut definitions: Vec<FunctionTool> =
            self.tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name.
    ///
    /// Defaults fill absent optional parameters; a missing required
    /// parameter is an error before the handler ever runs.
    pub async fn execute(
        &self,
        name: &str,
        mut arguments: Map<String, Value>,
        context: ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.into()))?;

        for spec in &tool.params {
            if arguments.contains_key(&spec.name) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    arguments.insert(spec.name.clone(), default.clone());
                }
                None => {
                    return Err(ToolError::MissingArgument {
                        tool: tool.name.clone(),
                        param: spec.name.clone(),
                    });
                }
            }
        }

        tool.execute(arguments, context).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    fn add_tool() -> Tool {
        Tool::builder("add", "Add two integers")
            .param::<i64>("a", "first addend")
            .param::<i64>("b", "second addend")
            .handler(|args, _ctx| async move {
                let a = args["a"].as_i64().unwrap_or(0);
                let b = args["b"].as_i64().unwrap_or(0);
                Ok(ToolOutput::Json(json!(a + b)))
            })
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn output_serialization_rules() {
        assert_eq!(ToolOutput::None.serialize(), "Success");
        assert_eq!(ToolOutput::Text("hi there".into()).serialize(), "hi there");
        assert_eq!(
            ToolOutput::Json(json!({"ok": true})).serialize(),
            r#"{"ok":true}"#
        );
        assert_eq!(ToolOutput::Json(json!(5)).serialize(), "5");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        assert!(matches!(
            registry.register(add_tool()),
            Err(ToolError::Duplicate(_))
        ));
    }

    #[test]
    fn definitions_are_sorted_and_complete() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();
        registry
            .register(
                Tool::builder("aaa_first", "sorts first")
                    .handler(|_args, _ctx| async { Ok(ToolOutput::None) }),
            )
            .unwrap();

        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "aaa_first");
        assert_eq!(defs[1].name, "add");
        assert_eq!(defs[1].parameters.required, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn execute_runs_the_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();

        let output = registry
            .execute("add", args(json!({"a": 2, "b": 3})), ToolContext::default())
            .await
            .unwrap();
        assert_eq!(output.serialize(), "5");
    }

    #[tokio::test]
    async fn missing_required_argument_fails_before_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool()).unwrap();

        let result = registry
            .execute("add", args(json!({"a": 2})), ToolContext::default())
            .await;
        assert!(matches!(
            result,
            Err(ToolError::MissingArgument { ref param, .. }) if param == "b"
        ));
    }

    #[tokio::test]
    async fn defaults_fill_absent_optionals() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                Tool::builder("greet", "Greet someone")
                    .param::<String>("name", "who to greet")
                    .optional_param::<String>("greeting", "salutation", json!("Hello"))
                    .handler(|args, _ctx| async move {
                        Ok(ToolOutput::Text(format!(
                            "{}, {}!",
                            args["greeting"].as_str().unwrap(),
                            args["name"].as_str().unwrap()
                        )))
                    }),
            )
            .unwrap();

        let output = registry
            .execute("greet", args(json!({"name": "M"})), ToolContext::default())
            .await
            .unwrap();
        assert_eq!(output.serialize(), "Hello, M!");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute("nope", Map::new(), ToolContext::default())
            .await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn blocking_handler_runs_off_loop() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                Tool::builder("sum_many", "Sum a large range").blocking_handler(
                    |_args, _ctx| {
                        let total: u64 = (0..1_000u64).sum();
                        Ok(ToolOutput::Json(json!(total)))
                    },
                ),
            )
            .unwrap();

        let output = registry
            .execute("sum_many", Map::new(), ToolContext::default())
            .await
            .unwrap();
        assert_eq!(output.serialize(), "499500");
    }

    struct EchoBackend;

    #[async_trait]
    impl McpBackend for EchoBackend {
        async fn call_tool(
            &self,
            name: &str,
            arguments: Map<String, Value>,
        ) -> Result<Value, ToolError> {
            Ok(json!({"tool": name, "args": arguments}))
        }
    }

    #[tokio::test]
    async fn mcp_tools_route_to_their_backend() {
        let mut registry = ToolRegistry::new();
        let definition = FunctionTool::new("remote_echo", "echoes via MCP");
        registry
            .register_mcp(definition, Arc::new(EchoBackend))
            .unwrap();

        let output = registry
            .execute(
                "remote_echo",
                args(json!({"x": 1})),
                ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::Json(json!({"tool": "remote_echo", "args": {"x": 1}}))
        );
    }
}
