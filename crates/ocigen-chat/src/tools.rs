//! Tool schema normalization for the OCI GenAI providers.
//!
//! Accepts the three host tool shapes and reduces them to a single
//! provider-neutral descriptor, stripping generated docstring noise from
//! descriptions along the way.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use ocigen_core::tools::{FunctionSchema, StructuredTool, ToolDefinition};

use crate::error::OciChatError;

/// Trailing `Args:` documentation block, including any blank line before it.
static ARGS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(?:\n?\n\s*?)?Args:.*$").expect("Invalid regex"));

/// One normalized tool parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    pub is_required: bool,
}

/// A tool reduced to the fields every provider conversion starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: BTreeMap<String, ParameterDefinition>,
}

/// Strips the generated call signature and trailing `Args:` block from a
/// tool description.
///
/// Auto-generated descriptions look like
/// `name(arg: type) -> ret - Summary.\n\nArgs:\n    arg: ...`; only the
/// summary is worth sending to the model. Plain descriptions pass through
/// unchanged, so cleaning an already-clean description is a no-op.
pub fn clean_tool_description(name: &str, description: &str) -> String {
    let pattern = format!(r"^{}\(.*?\) -(?:> \w+? -)? ", regex::escape(name));
    let without_signature = match Regex::new(&pattern) {
        Ok(signature) => signature.replace(description, "").into_owned(),
        Err(_) => description.to_string(),
    };
    ARGS_BLOCK.replace(&without_signature, "").into_owned()
}

/// Maps a JSON-schema type name onto the Rust display name used in
/// parameter definitions. Unrecognized names pass through unchanged.
pub fn rust_type_name(json_type: &str) -> &str {
    match json_type {
        "string" => "String",
        "number" => "f64",
        "boolean" => "bool",
        "integer" => "i64",
        "array" => "Vec",
        "object" => "Map",
        other => other,
    }
}

/// Reduces any accepted tool shape to a [`ToolDescriptor`].
///
/// Structured tools report `Some("")` for a missing parameter description
/// while the schema shapes report `None`; everything else comes out
/// identical for equivalent definitions.
pub fn normalize(tool: &ToolDefinition) -> Result<ToolDescriptor, OciChatError> {
    match tool {
        ToolDefinition::Structured(tool) => Ok(from_structured(tool)),
        ToolDefinition::Schema(value) => from_schema_map(value),
        ToolDefinition::Function(schema) => from_function_schema(schema),
    }
}

fn from_structured(tool: &StructuredTool) -> ToolDescriptor {
    let parameters = tool
        .args
        .iter()
        .map(|(p_name, p_def)| {
            let definition = ParameterDefinition {
                description: Some(p_def.description.clone().unwrap_or_default()),
                param_type: p_def
                    .arg_type
                    .as_deref()
                    .map(|t| rust_type_name(t).to_string()),
                is_required: p_def.default.is_none(),
            };
            (p_name.clone(), definition)
        })
        .collect();
    ToolDescriptor {
        name: tool.name.clone(),
        description: Some(clean_tool_description(&tool.name, &tool.description)),
        parameters,
    }
}

fn from_schema_map(value: &Value) -> Result<ToolDescriptor, OciChatError> {
    let map = match value {
        Value::Object(map) => map,
        other => return Err(OciChatError::UnsupportedToolType(json_type_of(other))),
    };
    if !["title", "description", "properties"]
        .iter()
        .all(|key| map.contains_key(*key))
    {
        return Err(OciChatError::InvalidToolShape);
    }
    let name = map
        .get("title")
        .and_then(Value::as_str)
        .ok_or(OciChatError::InvalidToolShape)?
        .to_string();
    let description = map
        .get("description")
        .and_then(Value::as_str)
        .map(|text| clean_tool_description(&name, text));
    let properties = map
        .get("properties")
        .and_then(Value::as_object)
        .ok_or(OciChatError::InvalidToolShape)?;
    let mut parameters = BTreeMap::new();
    for (p_name, p_def) in properties {
        let p_def = p_def.as_object().ok_or(OciChatError::InvalidToolShape)?;
        let is_required = !p_def.contains_key("default");
        parameters.insert(p_name.clone(), parameter_from_schema(p_def, is_required));
    }
    Ok(ToolDescriptor {
        name,
        description,
        parameters,
    })
}

fn from_function_schema(schema: &FunctionSchema) -> Result<ToolDescriptor, OciChatError> {
    let name = schema.name.clone();
    let description = schema
        .description
        .clone()
        .unwrap_or_else(|| name.clone());
    let required: Vec<&str> = schema
        .parameters
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let mut parameters = BTreeMap::new();
    if let Some(properties) = schema.parameters.get("properties").and_then(Value::as_object) {
        for (p_name, p_def) in properties {
            let p_def = p_def.as_object().ok_or(OciChatError::InvalidToolShape)?;
            let is_required = required.contains(&p_name.as_str());
            parameters.insert(p_name.clone(), parameter_from_schema(p_def, is_required));
        }
    }
    Ok(ToolDescriptor {
        name: name.clone(),
        description: Some(clean_tool_description(&name, &description)),
        parameters,
    })
}

fn parameter_from_schema(p_def: &Map<String, Value>, is_required: bool) -> ParameterDefinition {
    ParameterDefinition {
        description: p_def
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        param_type: p_def
            .get("type")
            .and_then(Value::as_str)
            .map(|t| rust_type_name(t).to_string()),
        is_required,
    }
}

fn json_type_of(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
