//! Request assembly for the chat action.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use ocigen_core::messages::Message;

use crate::config::OciGenAiConfig;
use crate::error::OciChatError;
use crate::provider::Provider;

/// Model ids with this prefix address a dedicated serving endpoint.
pub const CUSTOM_ENDPOINT_PREFIX: &str = "ocid1.generativeaiendpoint";

/// Where the service routes a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "serving_type")]
pub enum ServingMode {
    /// Shared capacity addressed by model id.
    #[serde(rename = "ON_DEMAND")]
    OnDemand { model_id: String },
    /// Provisioned capacity addressed by the endpoint OCID.
    #[serde(rename = "DEDICATED")]
    Dedicated { endpoint_id: String },
}

impl ServingMode {
    /// Picks the serving mode for a model id by its prefix.
    pub fn from_model_id(model_id: &str) -> ServingMode {
        if model_id.starts_with(CUSTOM_ENDPOINT_PREFIX) {
            ServingMode::Dedicated {
                endpoint_id: model_id.to_string(),
            }
        } else {
            ServingMode::OnDemand {
                model_id: model_id.to_string(),
            }
        }
    }
}

/// Complete body of one chat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDetails {
    pub compartment_id: String,
    pub serving_mode: ServingMode,
    /// Family-specific request parameters, fully merged.
    pub chat_request: Map<String, Value>,
}

/// Builds the chat call body for a conversation.
///
/// Request parameters are layered in fixed precedence: configured model
/// kwargs first, then per-call kwargs, then the provider's conversation
/// parameters. Later layers override earlier ones on key collisions, so
/// callers cannot spoof conversation fields like `message` or
/// `chat_history`.
pub fn build_chat_details(
    provider: &dyn Provider,
    config: &OciGenAiConfig,
    messages: &[Message],
    stop: Option<&[String]>,
    stream: bool,
    call_kwargs: &Map<String, Value>,
) -> Result<ChatDetails, OciChatError> {
    let mut provider_params = provider.messages_to_params(messages, call_kwargs)?;
    let force_single_step = call_kwargs
        .get("is_force_single_step")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    provider_params.insert("is_force_single_step".to_string(), json!(force_single_step));
    provider_params.insert("is_stream".to_string(), json!(stream));

    let mut model_kwargs = config.model_kwargs.clone();
    if let Some(stop) = stop {
        model_kwargs.insert(provider.stop_sequence_key().to_string(), json!(stop));
    }

    let mut chat_request = Map::new();
    for layer in [model_kwargs, call_kwargs.clone(), provider_params] {
        chat_request.extend(layer);
    }

    debug!(
        "Prepared {} chat request for model: {}",
        provider.name(),
        config.model_id
    );

    Ok(ChatDetails {
        compartment_id: config.compartment_id.clone(),
        serving_mode: ServingMode::from_model_id(&config.model_id),
        chat_request,
    })
}
