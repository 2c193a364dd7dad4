//! Chat results returned by providers, plus streaming aggregation.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messages::AiMessage;

/// One candidate completion for a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatGeneration {
    pub message: AiMessage,
    /// Provider-reported metadata for this generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_info: Option<Map<String, Value>>,
}

/// A streamed fragment of an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiMessageChunk {
    pub content: String,
}

/// One streamed fragment of a completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatGenerationChunk {
    pub message: AiMessageChunk,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_info: Option<Map<String, Value>>,
}

impl ChatGenerationChunk {
    pub fn new(content: impl Into<String>) -> Self {
        ChatGenerationChunk {
            message: AiMessageChunk {
                content: content.into(),
            },
            generation_info: None,
        }
    }
}

/// The full outcome of a chat request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub generations: Vec<ChatGeneration>,
    /// Request-level metadata such as the model id and request id.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub llm_output: Map<String, Value>,
}

impl ChatResult {
    /// Content of the first generation, or `""` when there is none.
    pub fn content(&self) -> &str {
        self.generations
            .first()
            .map(|g| g.message.content.as_str())
            .unwrap_or("")
    }
}

/// Drains a chunk stream into a single result.
///
/// Chunk contents are concatenated in arrival order. Generation metadata
/// maps are merged with later chunks overriding earlier keys. The first
/// error ends the drain and is returned unchanged.
pub async fn generate_from_stream<S, E>(mut stream: S) -> Result<ChatResult, E>
where
    S: Stream<Item = Result<ChatGenerationChunk, E>> + Unpin,
{
    let mut content = String::new();
    let mut info: Map<String, Value> = Map::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        content.push_str(&chunk.message.content);
        if let Some(extra) = chunk.generation_info {
            info.extend(extra);
        }
    }
    let generation = ChatGeneration {
        message: AiMessage {
            content,
            ..AiMessage::default()
        },
        generation_info: if info.is_empty() { None } else { Some(info) },
    };
    Ok(ChatResult {
        generations: vec![generation],
        llm_output: Map::new(),
    })
}
