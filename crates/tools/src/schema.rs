//! Typed parameter declarations and JSON-schema derivation.
//!
//! The mapping mirrors how the service interprets tool schemas: Rust
//! primitives map to the matching JSON types, containers to `array`/`object`,
//! `Option<T>` collapses to `T`, and anything else is advertised as a string.

use serde_json::Value;

use vox_domain::tool::{
    FunctionParameterProperty, FunctionParameters, JsonType,
};

/// JSON-schema kind a parameter is advertised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    pub fn to_json_type(self) -> JsonType {
        match self {
            ParamKind::String => JsonType::String,
            ParamKind::Integer => JsonType::Integer,
            ParamKind::Number => JsonType::Number,
            ParamKind::Boolean => JsonType::Boolean,
            ParamKind::Array => JsonType::Array,
            ParamKind::Object => JsonType::Object,
        }
    }
}

/// Types usable as tool parameters.
pub trait ToolParam {
    fn kind() -> ParamKind;
}

macro_rules! impl_tool_param {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(impl ToolParam for $ty {
            fn kind() -> ParamKind {
                $kind
            }
        })+
    };
}

impl_tool_param!(ParamKind::String => String, &str);
impl_tool_param!(ParamKind::Integer => i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);
impl_tool_param!(ParamKind::Number => f32, f64);
impl_tool_param!(ParamKind::Boolean => bool);

impl<T> ToolParam for Vec<T> {
    fn kind() -> ParamKind {
        ParamKind::Array
    }
}

impl<V> ToolParam for std::collections::HashMap<String, V> {
    fn kind() -> ParamKind {
        ParamKind::Object
    }
}

impl<V> ToolParam for std::collections::BTreeMap<String, V> {
    fn kind() -> ParamKind {
        ParamKind::Object
    }
}

impl ToolParam for serde_json::Map<String, Value> {
    fn kind() -> ParamKind {
        ParamKind::Object
    }
}

impl ToolParam for Value {
    fn kind() -> ParamKind {
        ParamKind::Object
    }
}

// A nullable parameter collapses to its non-null branch.
impl<T: ToolParam> ToolParam for Option<T> {
    fn kind() -> ParamKind {
        T::kind()
    }
}

/// One declared parameter of a local tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub description: Option<String>,
    pub kind: ParamKind,
    /// Parameters without a default are required.
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(&self) -> bool {
        self.default.is_none()
    }
}

/// Derive the wire schema from a parameter list.
pub fn build_parameters(specs: &[ParamSpec]) -> FunctionParameters {
    let mut parameters = FunctionParameters::default();
    for spec in specs {
        let mut property = FunctionParameterProperty::new(spec.kind.to_json_type());
        property.description = spec.description.clone();
        property.default = spec.default.clone();
        parameters.properties.insert(spec.name.clone(), property);
        if spec.required() {
            parameters.required.push(spec.name.clone());
        }
    }
    parameters
}
