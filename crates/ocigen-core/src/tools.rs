//! Tool definitions a chat model can be asked to call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One argument of a [`StructuredTool`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolArg {
    /// JSON-schema type of the argument (`string`, `integer`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub arg_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value. A present default, even `null`, marks the argument
    /// optional; an absent one marks it required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A host-defined tool with typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredTool {
    pub name: String,
    /// Human description. Auto-generated descriptions often embed the call
    /// signature and an `Args:` block; providers strip both before sending.
    pub description: String,
    #[serde(default)]
    pub args: BTreeMap<String, ToolArg>,
}

/// A function-calling schema in the OpenAI style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the parameters: a `properties` map plus a `required`
    /// name list.
    #[serde(default)]
    pub parameters: Value,
}

/// The tool shapes accepted when binding tools to a chat model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDefinition {
    /// A structured host tool.
    Structured(StructuredTool),
    /// A raw JSON-schema map carrying `title`, `description` and
    /// `properties` keys.
    Schema(Value),
    /// An OpenAI-style function schema.
    Function(FunctionSchema),
}

impl From<StructuredTool> for ToolDefinition {
    fn from(tool: StructuredTool) -> Self {
        ToolDefinition::Structured(tool)
    }
}

impl From<FunctionSchema> for ToolDefinition {
    fn from(schema: FunctionSchema) -> Self {
        ToolDefinition::Function(schema)
    }
}

impl From<Value> for ToolDefinition {
    fn from(schema: Value) -> Self {
        ToolDefinition::Schema(schema)
    }
}
