//! MCP wire format.
//!
//! The protocol is JSON-RPC 2.0, one message per line. Outbound traffic is
//! tiny (four methods), so frames are built with [`OutboundFrame::encode`]
//! instead of a full request/response type hierarchy; inbound lines are run
//! through [`InboundFrame::classify`], which never fails — anything that is
//! not protocol traffic is [`InboundFrame::Noise`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use vox_domain::tool::{
    FunctionParameterProperty, FunctionParameters, FunctionTool, FunctionToolKind, JsonType,
};

/// Protocol revision spoken during `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A frame the client writes: a request that expects a reply, or a
/// fire-and-forget notification.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Request {
        id: u64,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

impl OutboundFrame {
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        OutboundFrame::Request {
            id,
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        OutboundFrame::Notification {
            method: method.into(),
            params,
        }
    }

    /// Encode as one wire line (no trailing newline). Absent params are
    /// omitted entirely, never sent as null.
    pub fn encode(&self) -> String {
        let mut frame = Map::new();
        frame.insert("jsonrpc".into(), Value::String("2.0".into()));
        let (method, params) = match self {
            OutboundFrame::Request { id, method, params } => {
                frame.insert("id".into(), Value::from(*id));
                (method, params)
            }
            OutboundFrame::Notification { method, params } => (method, params),
        };
        frame.insert("method".into(), Value::String(method.clone()));
        if let Some(params) = params {
            frame.insert("params".into(), params.clone());
        }
        Value::Object(frame).to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound frames
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A call the server answered with its `error` object.
#[derive(Debug, Clone, thiserror::Error)]
#[error("server rejected the call (code {code}): {message}")]
pub struct RpcFailure {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcFailure {
    fn from_error_object(error: &Value) -> Self {
        Self {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned(),
            data: error.get("data").cloned(),
        }
    }
}

/// What one line of server stdout turned out to be.
#[derive(Debug)]
pub enum InboundFrame {
    /// The reply to one of our requests.
    Reply {
        id: u64,
        outcome: Result<Value, RpcFailure>,
    },
    /// A server-initiated notification or request. This client ignores them.
    ServerMessage { method: String },
    /// Not protocol traffic — a server logging to stdout, usually.
    Noise,
}

impl InboundFrame {
    /// Classify one line. A reply carries our numeric `id` and no `method`;
    /// anything with a `method` is server-initiated; the rest is noise.
    pub fn classify(line: &str) -> InboundFrame {
        let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
            return InboundFrame::Noise;
        };
        let Some(object) = value.as_object() else {
            return InboundFrame::Noise;
        };

        let id = object.get("id").and_then(Value::as_u64);
        let method = object.get("method").and_then(Value::as_str);
        match (id, method) {
            (Some(id), None) => {
                let outcome = match object.get("error") {
                    Some(error) => Err(RpcFailure::from_error_object(error)),
                    None => Ok(object.get("result").cloned().unwrap_or(Value::Null)),
                };
                InboundFrame::Reply { id, outcome }
            }
            (_, Some(method)) => InboundFrame::ServerMessage {
                method: method.to_owned(),
            },
            _ => InboundFrame::Noise,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MCP payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parameters for the `initialize` request.
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "voxagent",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

/// A single tool definition as it appears in a `tools/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Convert a discovered MCP tool into the registry's function-tool shape.
///
/// Nested arrays and objects are carried through so the model sees the full
/// schema; unrecognized property types degrade to `string`.
pub fn function_tool_from_def(def: &McpToolDef) -> FunctionTool {
    let mut parameters = FunctionParameters::default();

    if let Some(properties) = def.input_schema.get("properties").and_then(Value::as_object) {
        for (name, schema) in properties {
            parameters
                .properties
                .insert(name.clone(), parse_property(schema));
        }
    }
    if let Some(required) = def.input_schema.get("required").and_then(Value::as_array) {
        parameters.required = required
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect();
    }

    FunctionTool {
        kind: FunctionToolKind::Function,
        name: def.name.clone(),
        description: (!def.description.is_empty()).then(|| def.description.clone()),
        parameters,
    }
}

fn parse_property(schema: &Value) -> FunctionParameterProperty {
    let kind = schema
        .get("type")
        .and_then(Value::as_str)
        .map(map_json_type)
        .unwrap_or(JsonType::String);

    let mut property = FunctionParameterProperty::new(kind);
    property.description = schema
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_owned);
    property.default = schema.get("default").cloned();
    property.enumeration = schema.get("enum").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    });

    if kind == JsonType::Array {
        if let Some(items) = schema.get("items") {
            property.items = Some(Box::new(parse_property(items)));
        }
        property.min_items = schema
            .get("minItems")
            .and_then(Value::as_u64)
            .map(|n| n as u32);
    }

    if kind == JsonType::Object {
        if let Some(nested) = schema.get("properties").and_then(Value::as_object) {
            property.properties = Some(
                nested
                    .iter()
                    .map(|(name, nested_schema)| (name.clone(), parse_property(nested_schema)))
                    .collect(),
            );
            property.required = schema.get("required").and_then(Value::as_array).map(|r| {
                r.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            });
        }
    }

    property
}

fn map_json_type(type_str: &str) -> JsonType {
    match type_str.to_ascii_lowercase().as_str() {
        "object" => JsonType::Object,
        "array" => JsonType::Array,
        "number" => JsonType::Number,
        "integer" => JsonType::Integer,
        "boolean" => JsonType::Boolean,
        _ => JsonType::String,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_request_carries_id_method_and_params() {
        let line = OutboundFrame::request(7, "initialize", Some(initialize_params())).encode();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 7);
        assert_eq!(parsed["method"], "initialize");
        assert_eq!(parsed["params"]["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(parsed["params"]["clientInfo"]["name"], "voxagent");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn absent_params_are_omitted() {
        let line = OutboundFrame::request(2, "tools/list", None).encode();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("params").is_none());
    }

    #[test]
    fn notifications_have_no_id() {
        let line = OutboundFrame::notification("notifications/initialized", None).encode();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["method"], "notifications/initialized");
        assert!(parsed.get("id").is_none());
    }

    #[test]
    fn classify_success_reply() {
        let frame = InboundFrame::classify(r#"{"jsonrpc":"2.0","id":1,"result":{"capabilities":{}}}"#);
        match frame {
            InboundFrame::Reply { id, outcome } => {
                assert_eq!(id, 1);
                assert!(outcome.unwrap().get("capabilities").is_some());
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn classify_error_reply() {
        let frame = InboundFrame::classify(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32601,"message":"Method not found"}}"#,
        );
        match frame {
            InboundFrame::Reply { id, outcome } => {
                assert_eq!(id, 4);
                let failure = outcome.unwrap_err();
                assert_eq!(failure.code, -32601);
                assert_eq!(
                    failure.to_string(),
                    "server rejected the call (code -32601): Method not found"
                );
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn reply_without_result_is_null() {
        let frame = InboundFrame::classify(r#"{"jsonrpc":"2.0","id":3}"#);
        match frame {
            InboundFrame::Reply { outcome, .. } => assert_eq!(outcome.unwrap(), Value::Null),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn server_initiated_messages_are_recognized() {
        let frame = InboundFrame::classify(
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#,
        );
        assert!(matches!(
            frame,
            InboundFrame::ServerMessage { ref method } if method == "notifications/tools/list_changed"
        ));
    }

    #[test]
    fn logging_and_junk_are_noise() {
        assert!(matches!(
            InboundFrame::classify("starting server on stdio..."),
            InboundFrame::Noise
        ));
        assert!(matches!(InboundFrame::classify("[1,2,3]"), InboundFrame::Noise));
        assert!(matches!(InboundFrame::classify(""), InboundFrame::Noise));
    }

    #[test]
    fn tool_def_converts_with_nested_schema() {
        let raw = r#"{
            "name": "search_notes",
            "description": "Search notes",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "search text" },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1
                    },
                    "filter": {
                        "type": "object",
                        "properties": { "archived": { "type": "boolean" } },
                        "required": ["archived"]
                    }
                },
                "required": ["query"]
            }
        }"#;
        let def: McpToolDef = serde_json::from_str(raw).unwrap();
        let tool = function_tool_from_def(&def);

        assert_eq!(tool.name, "search_notes");
        assert_eq!(tool.parameters.required, vec!["query"]);
        let tags = &tool.parameters.properties["tags"];
        assert_eq!(tags.kind, JsonType::Array);
        assert_eq!(tags.min_items, Some(1));
        assert_eq!(tags.items.as_ref().unwrap().kind, JsonType::String);
        let filter = &tool.parameters.properties["filter"];
        assert_eq!(filter.kind, JsonType::Object);
        assert_eq!(
            filter.properties.as_ref().unwrap()["archived"].kind,
            JsonType::Boolean
        );
    }

    #[test]
    fn tool_def_without_schema_gets_empty_object() {
        let def: McpToolDef = serde_json::from_str(r#"{ "name": "ping" }"#).unwrap();
        let tool = function_tool_from_def(&def);
        assert!(tool.parameters.properties.is_empty());
        assert!(tool.description.is_none());
    }

    #[test]
    fn unknown_property_type_degrades_to_string() {
        let def: McpToolDef = serde_json::from_str(
            r#"{ "name": "odd", "inputSchema": { "properties": { "x": { "type": "tuple" } } } }"#,
        )
        .unwrap();
        let tool = function_tool_from_def(&def);
        assert_eq!(tool.parameters.properties["x"].kind, JsonType::String);
    }
}
