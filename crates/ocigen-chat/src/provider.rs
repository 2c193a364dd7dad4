//! Model-family abstraction for the OCI Generative AI chat API.
//!
//! The service exposes a single chat action whose request and response
//! dialects differ per model family. Each family implements [`Provider`];
//! the closed [`ProviderFamily`] enum picks the implementation from a
//! model id or an explicit provider name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use ocigen_core::messages::Message;
use ocigen_core::tools::ToolDefinition;

use crate::error::OciChatError;
use crate::providers::cohere::CohereProvider;
use crate::providers::generic::GenericProvider;
use crate::response::ChatResponseData;

/// Model families keyed by the name they use in model ids.
static PROVIDER_MAP: Lazy<HashMap<&'static str, ProviderFamily>> = Lazy::new(|| {
    HashMap::from([
        ("cohere", ProviderFamily::Cohere),
        ("meta", ProviderFamily::Generic),
    ])
});

/// Request/response dialect of one model family.
pub trait Provider: Send + Sync {
    /// Registry name of the family.
    fn name(&self) -> &'static str;

    /// Value of the `api_format` request discriminator.
    fn api_format(&self) -> &'static str;

    /// Request key under which stop sequences are sent.
    fn stop_sequence_key(&self) -> &'static str;

    /// Role tag for a message, if the family accepts its kind.
    fn role(&self, message: &Message) -> Result<&'static str, OciChatError>;

    /// Family-specific request parameters for a conversation.
    fn messages_to_params(
        &self,
        messages: &[Message],
        kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, OciChatError>;

    /// Converts one tool definition into the family's wire format.
    fn convert_tool(&self, tool: &ToolDefinition) -> Result<Value, OciChatError>;

    /// Full text of a non-streamed response.
    fn response_text(&self, response: &ChatResponseData) -> String;

    /// Generation metadata reported by a non-streamed response.
    fn generation_info(&self, response: &ChatResponseData)
        -> Result<Map<String, Value>, OciChatError>;

    /// Displayable delta carried by one stream event payload.
    fn stream_delta(&self, event: &Value) -> String;
}

/// The model families the adapter can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Cohere Command models: explicit chat history and native tools.
    Cohere,
    /// Meta Llama and other models behind the generic chat format.
    Generic,
}

impl ProviderFamily {
    /// Looks a family up by registry name.
    pub fn for_name(name: &str) -> Result<ProviderFamily, OciChatError> {
        PROVIDER_MAP
            .get(name)
            .copied()
            .ok_or_else(|| OciChatError::UnknownProvider(name.to_string()))
    }

    /// Resolves the family for a model. An explicit provider name wins;
    /// otherwise the segment of the model id before the first `.` decides.
    pub fn resolve(
        explicit: Option<&str>,
        model_id: &str,
    ) -> Result<ProviderFamily, OciChatError> {
        match explicit {
            Some(name) => Self::for_name(name),
            None => {
                let derived = model_id
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                Self::for_name(&derived)
            }
        }
    }

    fn strategy(&self) -> &'static dyn Provider {
        match self {
            ProviderFamily::Cohere => &CohereProvider,
            ProviderFamily::Generic => &GenericProvider,
        }
    }
}

impl Provider for ProviderFamily {
    fn name(&self) -> &'static str {
        self.strategy().name()
    }

    fn api_format(&self) -> &'static str {
        self.strategy().api_format()
    }

    fn stop_sequence_key(&self) -> &'static str {
        self.strategy().stop_sequence_key()
    }

    fn role(&self, message: &Message) -> Result<&'static str, OciChatError> {
        self.strategy().role(message)
    }

    fn messages_to_params(
        &self,
        messages: &[Message],
        kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, OciChatError> {
        self.strategy().messages_to_params(messages, kwargs)
    }

    fn convert_tool(&self, tool: &ToolDefinition) -> Result<Value, OciChatError> {
        self.strategy().convert_tool(tool)
    }

    fn response_text(&self, response: &ChatResponseData) -> String {
        self.strategy().response_text(response)
    }

    fn generation_info(
        &self,
        response: &ChatResponseData,
    ) -> Result<Map<String, Value>, OciChatError> {
        self.strategy().generation_info(response)
    }

    fn stream_delta(&self, event: &Value) -> String {
        self.strategy().stream_delta(event)
    }
}
