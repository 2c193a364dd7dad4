//! Error types for the chat adapter

use thiserror::Error;

/// Errors that can occur when translating or dispatching chat requests
#[derive(Debug, Error, PartialEq, Clone)]
pub enum OciChatError {
    /// Tool definition is a map but lacks the required descriptive fields
    #[error("Unsupported dict type: tool definitions need title, description and properties keys")]
    InvalidToolShape,

    /// Tool definition is none of the recognized shapes
    #[error("Unsupported tool type: {0}")]
    UnsupportedToolType(String),

    /// The selected model family cannot accept tools at all
    #[error("Tools not supported for {0} models")]
    ToolsUnsupported(&'static str),

    /// Message role has no mapping for the selected model family
    #[error("Message role {0} is not supported by {1} models")]
    UnknownMessageRole(String, &'static str),

    /// Model family is not one the adapter knows how to drive
    #[error("Provider {0} is not supported, expected one of: cohere, meta")]
    UnknownProvider(String),

    /// No backend client could be constructed for the configuration
    #[error("OCI GenAI backend unavailable: {0}")]
    ProviderUnavailable(String),

    /// Network error occurred
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error reported by the OCI GenAI service itself
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for OciChatError {
    fn from(err: serde_json::Error) -> Self {
        OciChatError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for OciChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OciChatError::Backend("Request timeout".to_string())
        } else if err.is_connect() {
            OciChatError::Network(err.to_string())
        } else {
            OciChatError::Backend(err.to_string())
        }
    }
}
