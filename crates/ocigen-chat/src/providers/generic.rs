//! Generic chat dialect used by Meta Llama models
//!
//! The generic format sends the whole conversation as a flat message list
//! and has no tool support at all.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use ocigen_core::messages::Message;
use ocigen_core::tools::ToolDefinition;

use crate::error::OciChatError;
use crate::provider::Provider;
use crate::response::ChatResponseData;

/// Adapter for the `meta.*` model family.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericProvider;

impl Provider for GenericProvider {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn api_format(&self) -> &'static str {
        "GENERIC"
    }

    fn stop_sequence_key(&self) -> &'static str {
        "stop"
    }

    fn role(&self, message: &Message) -> Result<&'static str, OciChatError> {
        match message {
            Message::Human { .. } => Ok("USER"),
            Message::Ai(_) => Ok("ASSISTANT"),
            Message::System { .. } => Ok("SYSTEM"),
            other => Err(OciChatError::UnknownMessageRole(
                other.kind().to_string(),
                "meta",
            )),
        }
    }

    fn messages_to_params(
        &self,
        messages: &[Message],
        _kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, OciChatError> {
        let mut oci_messages = Vec::with_capacity(messages.len());
        for message in messages {
            let wire = GenericMessage {
                role: self.role(message)?.to_string(),
                content: vec![TextContent::new(message.content())],
            };
            oci_messages.push(serde_json::to_value(wire)?);
        }

        let mut params = Map::new();
        params.insert("messages".to_string(), Value::Array(oci_messages));
        params.insert("api_format".to_string(), json!(self.api_format()));
        params.insert("top_k".to_string(), json!(-1));
        Ok(params)
    }

    fn convert_tool(&self, _tool: &ToolDefinition) -> Result<Value, OciChatError> {
        Err(OciChatError::ToolsUnsupported("meta"))
    }

    fn response_text(&self, response: &ChatResponseData) -> String {
        response
            .chat_response
            .choices
            .as_deref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.message.content.first())
            .map(|block| block.text.clone())
            .unwrap_or_default()
    }

    fn generation_info(
        &self,
        response: &ChatResponseData,
    ) -> Result<Map<String, Value>, OciChatError> {
        let payload = &response.chat_response;
        let finish_reason = payload
            .choices
            .as_deref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.finish_reason.clone());
        let mut info = Map::new();
        info.insert(
            "finish_reason".to_string(),
            finish_reason.map_or(Value::Null, Value::String),
        );
        info.insert(
            "time_created".to_string(),
            payload
                .time_created
                .map_or(Value::Null, |t| json!(t.to_rfc3339())),
        );
        Ok(info)
    }

    fn stream_delta(&self, event: &Value) -> String {
        event
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(|content| content.get(0))
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Generic chat message wire format
#[derive(Debug, Serialize, Deserialize)]
struct GenericMessage {
    role: String,
    content: Vec<TextContent>,
}

/// Text block inside a generic chat message
#[derive(Debug, Serialize, Deserialize)]
struct TextContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

impl TextContent {
    fn new(text: impl Into<String>) -> Self {
        TextContent {
            content_type: "TEXT".to_string(),
            text: text.into(),
        }
    }
}
