//! Conversation messages exchanged with a chat model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier correlating this call with a later tool result.
    pub id: String,
    /// Name of the tool the model wants to invoke.
    pub name: String,
    /// Arguments the model chose, keyed by parameter name.
    pub args: Map<String, Value>,
}

/// An assistant turn, together with any tool calls it requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub content: String,
    /// Provider metadata attached to the turn (citations, finish reason, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_kwargs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// A single message in a conversation, tagged by who produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Instructions that frame the whole conversation.
    System { content: String },
    /// A message written by the end user.
    Human { content: String },
    /// A turn produced by the model.
    Ai(AiMessage),
    /// The output of a tool invocation the model requested earlier.
    Tool {
        content: String,
        /// Id of the [`ToolCall`] this message answers.
        tool_call_id: String,
    },
    /// A message with a caller-defined role outside the standard set.
    Custom { role: String, content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai(AiMessage {
            content: content.into(),
            ..AiMessage::default()
        })
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Ai(AiMessage {
            content: content.into(),
            tool_calls,
            ..AiMessage::default()
        })
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn custom(role: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Custom {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Text content of the message.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::Human { content }
            | Message::Tool { content, .. }
            | Message::Custom { content, .. } => content,
            Message::Ai(msg) => &msg.content,
        }
    }

    /// Tool calls carried by an assistant message; empty for other roles.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Ai(msg) => &msg.tool_calls,
            _ => &[],
        }
    }

    /// Short label for the message kind, used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::Ai(_) => "ai",
            Message::Tool { .. } => "tool",
            Message::Custom { role, .. } => role,
        }
    }
}

impl From<AiMessage> for Message {
    fn from(msg: AiMessage) -> Self {
        Message::Ai(msg)
    }
}
