//! Tool definitions exposed to the realtime model.
//!
//! These are the JSON-Schema-flavored shapes the service expects inside
//! `session.tools`. Both locally registered tools and MCP-discovered tools
//! are normalized into [`FunctionTool`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

/// How the model is allowed to pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    None,
    #[default]
    Auto,
    Required,
}

/// One parameter in a tool's schema. Nested `items`/`properties` support
/// arrays and objects coming from MCP servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameterProperty {
    #[serde(rename = "type")]
    pub kind: JsonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FunctionParameterProperty>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, FunctionParameterProperty>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FunctionParameterProperty {
    pub fn new(kind: JsonType) -> Self {
        Self {
            kind,
            description: None,
            items: None,
            enumeration: None,
            properties: None,
            required: None,
            min_items: None,
            default: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The `parameters` object of a function tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    pub kind: String,
    pub strict: bool,
    pub properties: BTreeMap<String, FunctionParameterProperty>,
    pub required: Vec<String>,
}

impl Default for FunctionParameters {
    fn default() -> Self {
        Self {
            kind: "object".into(),
            strict: true,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A function tool as advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: FunctionToolKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: FunctionParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionToolKind {
    #[default]
    Function,
}

impl FunctionTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: FunctionToolKind::Function,
            name: name.into(),
            description: Some(description.into()),
            parameters: FunctionParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_tool_wire_shape() {
        let mut tool = FunctionTool::new("add", "Add two integers");
        tool.parameters.properties.insert(
            "a".into(),
            FunctionParameterProperty::new(JsonType::Integer).with_description("first addend"),
        );
        tool.parameters.required.push("a".into());

        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["name"], "add");
        assert_eq!(json["parameters"]["type"], "object");
        assert_eq!(json["parameters"]["strict"], true);
        assert_eq!(json["parameters"]["properties"]["a"]["type"], "integer");
        assert_eq!(json["parameters"]["required"][0], "a");
    }

    #[test]
    fn property_skips_unset_fields() {
        let prop = FunctionParameterProperty::new(JsonType::String);
        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert_eq!(json["type"], "string");
    }

    #[test]
    fn min_items_uses_wire_alias() {
        let mut prop = FunctionParameterProperty::new(JsonType::Array);
        prop.min_items = Some(1);
        let json = serde_json::to_string(&prop).unwrap();
        assert!(json.contains("\"minItems\":1"));
    }
}
