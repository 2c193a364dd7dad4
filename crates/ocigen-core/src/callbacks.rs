//! Callback hooks for observing streamed model output.

use crate::results::ChatGenerationChunk;

/// Receives each streamed token before it is handed to the caller.
pub trait CallbackHandler: Send + Sync {
    /// Called once per streamed chunk, before the chunk is yielded.
    fn on_llm_new_token(&self, token: &str, chunk: &ChatGenerationChunk);
}

/// A handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbackHandler;

impl CallbackHandler for NoopCallbackHandler {
    fn on_llm_new_token(&self, _token: &str, _chunk: &ChatGenerationChunk) {}
}
