//! Configuration for the OCI Generative AI chat model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the backend client authenticates against OCI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    /// Key pair from the local OCI config file.
    #[default]
    ApiKey,
    /// Short-lived session token created by the OCI CLI.
    SecurityToken,
    /// Identity of the compute instance running the code.
    InstancePrincipal,
    /// Identity of the resource (function, container) running the code.
    ResourcePrincipal,
}

/// Settings for one chat model deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OciGenAiConfig {
    /// Model id such as `cohere.command-r-16k`, or the OCID of a dedicated
    /// serving endpoint.
    pub model_id: String,
    /// Base URL of the Generative AI inference endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_endpoint: Option<String>,
    /// Compartment the requests run in.
    pub compartment_id: String,
    /// Authentication scheme the backend client should use.
    #[serde(default)]
    pub auth_type: AuthType,
    /// Profile name inside the OCI config file.
    #[serde(default = "default_auth_profile")]
    pub auth_profile: String,
    /// Explicit provider name, overriding inference from the model id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Stream responses internally even for plain generate calls.
    #[serde(default)]
    pub is_stream: bool,
    /// Model parameters sent with every request (temperature, max_tokens, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub model_kwargs: Map<String, Value>,
}

fn default_auth_profile() -> String {
    "DEFAULT".to_string()
}

impl Default for OciGenAiConfig {
    fn default() -> Self {
        OciGenAiConfig {
            model_id: String::new(),
            service_endpoint: None,
            compartment_id: String::new(),
            auth_type: AuthType::default(),
            auth_profile: default_auth_profile(),
            provider: None,
            is_stream: false,
            model_kwargs: Map::new(),
        }
    }
}

impl OciGenAiConfig {
    pub fn new(model_id: impl Into<String>, compartment_id: impl Into<String>) -> Self {
        OciGenAiConfig {
            model_id: model_id.into(),
            compartment_id: compartment_id.into(),
            ..OciGenAiConfig::default()
        }
    }

    pub fn with_service_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.service_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_auth(mut self, auth_type: AuthType, profile: impl Into<String>) -> Self {
        self.auth_type = auth_type;
        self.auth_profile = profile.into();
        self
    }

    pub fn with_streaming(mut self, is_stream: bool) -> Self {
        self.is_stream = is_stream;
        self
    }

    pub fn with_model_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.model_kwargs.insert(key.into(), value);
        self
    }
}
