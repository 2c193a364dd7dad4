//! Response envelope and post-processing for chat calls.
//!
//! The service answers every chat request with one JSON body shape; which
//! fields are populated depends on the model family. Providers read the
//! fields they know, everything else stays `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use ocigen_core::messages::ToolCall;

/// A chat response together with its transport metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseEnvelope {
    pub data: ChatResponseData,
    /// Service-assigned request id (`opc-request-id` header).
    #[serde(default)]
    pub request_id: String,
    /// Value of the `content-length` response header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

/// The chat response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseData {
    pub chat_response: ChatResponsePayload,
    #[serde(default, alias = "modelId")]
    pub model_id: String,
    #[serde(default, alias = "modelVersion")]
    pub model_version: String,
}

/// Family-dependent response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponsePayload {
    /// Cohere: full text of the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Cohere: documents the reply drew on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Value>,
    /// Cohere: citations into those documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Value>,
    /// Cohere: search queries the model proposed.
    #[serde(default, alias = "searchQueries", skip_serializing_if = "Option::is_none")]
    pub search_queries: Option<Value>,
    #[serde(default, alias = "isSearchRequired", skip_serializing_if = "Option::is_none")]
    pub is_search_required: Option<bool>,
    #[serde(default, alias = "finishReason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Cohere: tool calls the model wants executed.
    #[serde(default, alias = "toolCalls", skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<RawToolCall>>,
    /// Generic: one choice per generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<GenericChoice>>,
    /// Generic: creation time of the reply.
    #[serde(default, alias = "timeCreated", skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,
}

/// A tool call as the Cohere family reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// One generation choice in a generic-format response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericChoice {
    pub message: GenericResponseMessage,
    #[serde(default, alias = "finishReason", skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Message body of a generic-format choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericResponseMessage {
    #[serde(default)]
    pub content: Vec<GenericResponseText>,
}

/// One text block inside a generic-format message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericResponseText {
    #[serde(default)]
    pub text: String,
}

/// Truncates `text` at the first occurrence of any stop token.
pub fn enforce_stop_tokens(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter_map(|token| text.find(token.as_str()))
        .min();
    match cut {
        Some(idx) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Converts service-reported tool calls into host tool calls, assigning a
/// fresh id to each.
pub fn convert_tool_calls(raw: &[RawToolCall]) -> Vec<ToolCall> {
    raw.iter()
        .map(|call| ToolCall {
            id: Uuid::new_v4().simple().to_string(),
            name: call.name.clone(),
            args: call.parameters.clone(),
        })
        .collect()
}

/// Request-level metadata reported alongside a response.
pub fn llm_output(envelope: &ChatResponseEnvelope) -> Map<String, Value> {
    let mut output = Map::new();
    output.insert("model_id".to_string(), json!(envelope.data.model_id));
    output.insert(
        "model_version".to_string(),
        json!(envelope.data.model_version),
    );
    output.insert("request_id".to_string(), json!(envelope.request_id));
    output.insert(
        "content-length".to_string(),
        envelope.content_length.map_or(Value::Null, |v| json!(v)),
    );
    output
}
