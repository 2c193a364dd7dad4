//! Host-side chat primitives shared by the OCI Generative AI crates.
//!
//! Defines the conversation message types, the tool definition shapes a
//! model can be asked to call, the result types a chat request produces,
//! and the callback hooks used to observe streamed output.

pub mod callbacks;
pub mod messages;
pub mod results;
pub mod tools;

pub use callbacks::{CallbackHandler, NoopCallbackHandler};
pub use messages::{AiMessage, Message, ToolCall};
pub use results::{
    generate_from_stream, AiMessageChunk, ChatGeneration, ChatGenerationChunk, ChatResult,
};
pub use tools::{FunctionSchema, StructuredTool, ToolArg, ToolDefinition};
