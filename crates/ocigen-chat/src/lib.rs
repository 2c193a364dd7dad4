//! OCI Generative AI chat adapter - conversation translation and dispatch
//!
//! This crate turns host conversations, tool definitions and call options
//! into the request dialect of the model family serving an OCI Generative AI
//! deployment (Cohere or the generic Meta format), dispatches them over a
//! pluggable backend client, and maps responses and event streams back into
//! host chat results.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod request;
pub mod response;
pub mod tools;

// Re-export commonly used types
pub use chat::{CallOptions, ChunkStream, OciGenAiChat, StructuredOutputChat};
pub use client::{
    BearerSigner, EventStream, GenAiClient, HttpGenAiClient, NoopSigner, RequestSigner, SseEvent,
    CHAT_API_PATH,
};
pub use config::{AuthType, OciGenAiConfig};
pub use error::OciChatError;
pub use provider::{Provider, ProviderFamily};
pub use providers::{CohereProvider, GenericProvider};
pub use request::{build_chat_details, ChatDetails, ServingMode, CUSTOM_ENDPOINT_PREFIX};
pub use response::{
    convert_tool_calls, enforce_stop_tokens, ChatResponseData, ChatResponseEnvelope,
    ChatResponsePayload, GenericChoice, RawToolCall,
};
pub use tools::{clean_tool_description, normalize, ParameterDefinition, ToolDescriptor};
