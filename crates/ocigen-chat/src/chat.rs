//! The OCI Generative AI chat model.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use ocigen_core::callbacks::CallbackHandler;
use ocigen_core::messages::{AiMessage, Message};
use ocigen_core::results::{generate_from_stream, ChatGeneration, ChatGenerationChunk, ChatResult};
use ocigen_core::tools::ToolDefinition;

use crate::client::{GenAiClient, HttpGenAiClient};
use crate::config::OciGenAiConfig;
use crate::error::OciChatError;
use crate::provider::{Provider, ProviderFamily};
use crate::request::{self, ChatDetails};
use crate::response;
use crate::tools;

/// Stream of result chunks produced by [`OciGenAiChat::stream`].
pub type ChunkStream = BoxStream<'static, Result<ChatGenerationChunk, OciChatError>>;

/// Per-call options for a chat request.
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Stop sequences that truncate the completion.
    pub stop: Option<Vec<String>>,
    /// Extra request parameters for this call only.
    pub kwargs: Map<String, Value>,
    /// Receiver for streamed tokens.
    pub callbacks: Option<Arc<dyn CallbackHandler>>,
}

impl CallOptions {
    pub fn new() -> Self {
        CallOptions::default()
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Asks Cohere models to answer tool results in a single step.
    pub fn with_force_single_step(mut self, force: bool) -> Self {
        self.kwargs
            .insert("is_force_single_step".to_string(), json!(force));
        self
    }

    pub fn with_callbacks(mut self, callbacks: Arc<dyn CallbackHandler>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }
}

/// Chat model backed by the OCI Generative AI service.
///
/// Translates conversations into the request dialect of the configured
/// model family, dispatches them through a [`GenAiClient`] and maps the
/// responses back into [`ChatResult`]s.
#[derive(Clone)]
pub struct OciGenAiChat {
    config: OciGenAiConfig,
    client: Arc<dyn GenAiClient>,
    bound_kwargs: Map<String, Value>,
}

impl OciGenAiChat {
    /// Creates a chat model that talks to the configured service endpoint.
    pub fn new(config: OciGenAiConfig) -> Result<Self, OciChatError> {
        let endpoint = config.service_endpoint.clone().ok_or_else(|| {
            OciChatError::ProviderUnavailable(
                "service_endpoint is not set; configure one or inject a client".to_string(),
            )
        })?;
        let client = HttpGenAiClient::new(endpoint)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Creates a chat model on top of a caller-provided backend client.
    pub fn with_client(config: OciGenAiConfig, client: Arc<dyn GenAiClient>) -> Self {
        OciGenAiChat {
            config,
            client,
            bound_kwargs: Map::new(),
        }
    }

    pub fn config(&self) -> &OciGenAiConfig {
        &self.config
    }

    /// The model family serving this configuration.
    pub fn provider(&self) -> Result<ProviderFamily, OciChatError> {
        ProviderFamily::resolve(self.config.provider.as_deref(), &self.config.model_id)
    }

    /// Returns a copy with an extra request parameter bound to every call.
    pub fn with_bound_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.bound_kwargs.insert(key.into(), value);
        self
    }

    /// Returns a copy with tools attached to every call, converted into the
    /// model family's wire format up front.
    pub fn bind_tools(&self, tools: &[ToolDefinition]) -> Result<Self, OciChatError> {
        let provider = self.provider()?;
        let mut formatted = Vec::with_capacity(tools.len());
        for tool in tools {
            formatted.push(provider.convert_tool(tool)?);
        }

        let mut bound = self.clone();
        bound
            .bound_kwargs
            .insert("tools".to_string(), Value::Array(formatted));
        Ok(bound)
    }

    /// Returns a wrapper that binds `schema` as the only tool and parses
    /// the reply's matching tool call into `T`.
    pub fn with_structured_output<T: DeserializeOwned>(
        &self,
        schema: &ToolDefinition,
    ) -> Result<StructuredOutputChat<T>, OciChatError> {
        let descriptor = tools::normalize(schema)?;
        let chat = self.bind_tools(std::slice::from_ref(schema))?;
        Ok(StructuredOutputChat {
            chat,
            key_name: descriptor.name,
            marker: PhantomData,
        })
    }

    /// Assembles the request body for a conversation without sending it.
    pub fn prepare_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
        stream: bool,
    ) -> Result<ChatDetails, OciChatError> {
        let provider = self.provider()?;
        self.build_details(&provider, messages, options, stream)
    }

    /// Runs a chat call and returns the model's reply.
    ///
    /// With `is_stream` configured the call streams internally and
    /// aggregates the chunks into one result.
    pub async fn generate(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ChatResult, OciChatError> {
        if self.config.is_stream {
            let stream = self.stream(messages, options).await?;
            return generate_from_stream(stream).await;
        }

        let provider = self.provider()?;
        let details = self.build_details(&provider, messages, options, false)?;
        debug!("Sending chat request for model: {}", self.config.model_id);
        let envelope = self.client.chat(details).await?;

        let mut content = provider.response_text(&envelope.data);
        if let Some(stop) = options.stop.as_deref() {
            content = response::enforce_stop_tokens(&content, stop);
        }

        let info = provider.generation_info(&envelope.data)?;
        let tool_calls = if info.contains_key("tool_calls") {
            let raw = envelope.data.chat_response.tool_calls.as_deref().unwrap_or(&[]);
            response::convert_tool_calls(raw)
        } else {
            Vec::new()
        };

        let message = AiMessage {
            content,
            additional_kwargs: info.clone(),
            tool_calls,
        };
        Ok(ChatResult {
            generations: vec![ChatGeneration {
                message,
                generation_info: Some(info),
            }],
            llm_output: response::llm_output(&envelope),
        })
    }

    /// Runs a chat call and yields the reply incrementally.
    ///
    /// Each stream event becomes one chunk; registered callbacks see every
    /// token before its chunk is yielded.
    pub async fn stream(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<ChunkStream, OciChatError> {
        let provider = self.provider()?;
        let details = self.build_details(&provider, messages, options, true)?;
        debug!(
            "Starting streaming chat request for model: {}",
            self.config.model_id
        );
        let events = self.client.chat_stream(details).await?;

        let callbacks = options.callbacks.clone();
        let chunks = events.map(move |event| {
            let event = event?;
            let payload: Value = serde_json::from_str(&event.data)?;
            let delta = provider.stream_delta(&payload);
            let chunk = ChatGenerationChunk::new(delta.clone());
            if let Some(handler) = callbacks.as_deref() {
                handler.on_llm_new_token(&delta, &chunk);
            }
            Ok(chunk)
        });

        Ok(chunks.boxed())
    }

    fn build_details(
        &self,
        provider: &ProviderFamily,
        messages: &[Message],
        options: &CallOptions,
        stream: bool,
    ) -> Result<ChatDetails, OciChatError> {
        let mut call_kwargs = self.bound_kwargs.clone();
        call_kwargs.extend(options.kwargs.clone());
        request::build_chat_details(
            provider,
            &self.config,
            messages,
            options.stop.as_deref(),
            stream,
            &call_kwargs,
        )
    }
}

/// Chat wrapper that extracts one schema-shaped tool call per reply.
pub struct StructuredOutputChat<T> {
    chat: OciGenAiChat,
    key_name: String,
    marker: PhantomData<T>,
}

impl<T: DeserializeOwned> StructuredOutputChat<T> {
    /// Runs a chat call and parses the bound tool's arguments into `T`.
    pub async fn generate(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<T, OciChatError> {
        let result = self.chat.generate(messages, options).await?;
        let generation = result
            .generations
            .first()
            .ok_or_else(|| OciChatError::Backend("No generations in response".to_string()))?;

        let call = generation
            .message
            .tool_calls
            .iter()
            .find(|call| call.name == self.key_name)
            .ok_or_else(|| {
                OciChatError::Backend(format!(
                    "Model did not call the {} tool, it answered: {}",
                    self.key_name, generation.message.content
                ))
            })?;

        Ok(serde_json::from_value(Value::Object(call.args.clone()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;

    use crate::client::{EventStream, SseEvent};
    use crate::response::{ChatResponseEnvelope, RawToolCall};
    use ocigen_core::tools::FunctionSchema;

    struct StubClient {
        envelope: ChatResponseEnvelope,
        events: Vec<String>,
        last_details: Mutex<Option<ChatDetails>>,
    }

    impl StubClient {
        fn with_text(text: &str) -> Self {
            let mut envelope = ChatResponseEnvelope::default();
            envelope.data.model_id = "cohere.command-r-16k".to_string();
            envelope.data.model_version = "1.2".to_string();
            envelope.data.chat_response.text = Some(text.to_string());
            envelope.data.chat_response.finish_reason = Some("COMPLETE".to_string());
            envelope.request_id = "req-1".to_string();
            envelope.content_length = Some(128);
            StubClient {
                envelope,
                events: Vec::new(),
                last_details: Mutex::new(None),
            }
        }

        fn with_events(events: &[&str]) -> Self {
            let mut stub = Self::with_text("");
            stub.events = events.iter().map(|e| e.to_string()).collect();
            stub
        }

        fn details(&self) -> ChatDetails {
            self.last_details
                .lock()
                .unwrap()
                .clone()
                .expect("no request captured")
        }
    }

    #[async_trait]
    impl GenAiClient for StubClient {
        async fn chat(&self, details: ChatDetails) -> Result<ChatResponseEnvelope, OciChatError> {
            *self.last_details.lock().unwrap() = Some(details);
            Ok(self.envelope.clone())
        }

        async fn chat_stream(&self, details: ChatDetails) -> Result<EventStream, OciChatError> {
            *self.last_details.lock().unwrap() = Some(details);
            let events: Vec<Result<SseEvent, OciChatError>> = self
                .events
                .clone()
                .into_iter()
                .map(|data| Ok(SseEvent { data }))
                .collect();
            Ok(futures::stream::iter(events).boxed())
        }
    }

    #[derive(Default)]
    struct Recorder {
        tokens: Mutex<Vec<String>>,
    }

    impl CallbackHandler for Recorder {
        fn on_llm_new_token(&self, token: &str, _chunk: &ChatGenerationChunk) {
            self.tokens.lock().unwrap().push(token.to_string());
        }
    }

    fn config() -> OciGenAiConfig {
        OciGenAiConfig::new("cohere.command-r-16k", "ocid1.compartment.oc1..x")
    }

    #[tokio::test]
    async fn test_generate_returns_text_and_metadata() {
        let stub = Arc::new(StubClient::with_text("Vienna."));
        let chat = OciGenAiChat::with_client(config(), stub.clone());

        let result = chat
            .generate(&[Message::human("Capital of Austria?")], &CallOptions::new())
            .await
            .unwrap();

        assert_eq!(result.content(), "Vienna.");
        assert_eq!(result.llm_output["model_id"], json!("cohere.command-r-16k"));
        assert_eq!(result.llm_output["model_version"], json!("1.2"));
        assert_eq!(result.llm_output["request_id"], json!("req-1"));
        assert_eq!(result.llm_output["content-length"], json!(128));

        let generation = &result.generations[0];
        let info = generation.generation_info.as_ref().unwrap();
        assert_eq!(info["finish_reason"], json!("COMPLETE"));
        assert_eq!(generation.message.additional_kwargs, *info);

        let details = stub.details();
        assert_eq!(details.chat_request["message"], json!("Capital of Austria?"));
        assert_eq!(details.chat_request["is_stream"], json!(false));
    }

    #[tokio::test]
    async fn test_generate_applies_stop_tokens() {
        let stub = Arc::new(StubClient::with_text("Paris is lovely"));
        let chat = OciGenAiChat::with_client(config(), stub.clone());

        let options = CallOptions::new().with_stop(vec![" is".to_string()]);
        let result = chat
            .generate(&[Message::human("Capital of France?")], &options)
            .await
            .unwrap();

        assert_eq!(result.content(), "Paris");
        let details = stub.details();
        assert_eq!(details.chat_request["stop_sequences"], json!([" is"]));
    }

    #[tokio::test]
    async fn test_generate_surfaces_tool_calls_with_fresh_ids() {
        let mut stub = StubClient::with_text("");
        let mut parameters = Map::new();
        parameters.insert("city".to_string(), json!("Graz"));
        stub.envelope.data.chat_response.tool_calls = Some(vec![RawToolCall {
            name: "get_weather".to_string(),
            parameters,
        }]);
        let chat = OciGenAiChat::with_client(config(), Arc::new(stub));

        let result = chat
            .generate(&[Message::human("Weather in Graz?")], &CallOptions::new())
            .await
            .unwrap();

        let message = &result.generations[0].message;
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].name, "get_weather");
        assert_eq!(message.tool_calls[0].args["city"], json!("Graz"));
        assert_eq!(message.tool_calls[0].id.len(), 32);
        assert!(message.additional_kwargs.contains_key("tool_calls"));
    }

    #[tokio::test]
    async fn test_bind_tools_sends_formatted_tools() {
        let stub = Arc::new(StubClient::with_text("ok"));
        let schema = ToolDefinition::from(FunctionSchema {
            name: "get_weather".to_string(),
            description: Some("Look up the weather for a city.".to_string()),
            parameters: json!({
                "type": "object",
                "properties": {"city": {"type": "string", "description": "City name."}},
                "required": ["city"],
            }),
        });

        let chat = OciGenAiChat::with_client(config(), stub.clone())
            .bind_tools(&[schema])
            .unwrap();
        chat.generate(&[Message::human("Weather in Graz?")], &CallOptions::new())
            .await
            .unwrap();

        let details = stub.details();
        let tools = details.chat_request["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], json!("get_weather"));
        assert!(tools[0]["parameter_definitions"]["city"].is_object());
    }

    #[test]
    fn test_bind_tools_rejected_for_generic_family() {
        let stub = Arc::new(StubClient::with_text("ok"));
        let config = OciGenAiConfig::new("meta.llama-3.3-70b-instruct", "ocid1.compartment.oc1..x");
        let chat = OciGenAiChat::with_client(config, stub);

        let schema = ToolDefinition::Schema(json!({
            "title": "person",
            "description": "A person record",
            "properties": {"name": {"type": "string"}},
        }));
        assert_eq!(
            chat.bind_tools(&[schema]).err(),
            Some(OciChatError::ToolsUnsupported("meta"))
        );
    }

    #[tokio::test]
    async fn test_stream_emits_chunks_and_notifies_callbacks() {
        let stub = Arc::new(StubClient::with_events(&[
            r#"{"apiFormat":"COHERE","text":"Hel"}"#,
            r#"{"text":"lo"}"#,
            r#"{"finishReason":"COMPLETE"}"#,
        ]));
        let chat = OciGenAiChat::with_client(config(), stub.clone());

        let recorder = Arc::new(Recorder::default());
        let options = CallOptions::new().with_callbacks(recorder.clone());
        let mut stream = chat
            .stream(&[Message::human("hi")], &options)
            .await
            .unwrap();

        let mut contents = Vec::new();
        while let Some(chunk) = stream.next().await {
            contents.push(chunk.unwrap().message.content);
        }
        assert_eq!(contents, vec!["Hel", "lo", ""]);
        assert_eq!(*recorder.tokens.lock().unwrap(), vec!["Hel", "lo", ""]);

        let details = stub.details();
        assert_eq!(details.chat_request["is_stream"], json!(true));
    }

    #[tokio::test]
    async fn test_configured_streaming_aggregates_chunks() {
        let stub = Arc::new(StubClient::with_events(&[
            r#"{"text":"Hel"}"#,
            r#"{"text":"lo"}"#,
        ]));
        let chat = OciGenAiChat::with_client(config().with_streaming(true), stub);

        let result = chat
            .generate(&[Message::human("hi")], &CallOptions::new())
            .await
            .unwrap();

        assert_eq!(result.content(), "Hello");
        assert!(result.llm_output.is_empty());
    }

    #[test]
    fn test_new_requires_a_service_endpoint() {
        assert!(matches!(
            OciGenAiChat::new(config()),
            Err(OciChatError::ProviderUnavailable(_))
        ));
        assert!(OciGenAiChat::new(
            config().with_service_endpoint("https://inference.example.com")
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_model_family_is_rejected() {
        let stub = Arc::new(StubClient::with_text("ok"));
        let config = OciGenAiConfig::new("mistral.small-3", "ocid1.compartment.oc1..x");
        let chat = OciGenAiChat::with_client(config, stub);

        let result = chat
            .generate(&[Message::human("hi")], &CallOptions::new())
            .await;
        assert_eq!(
            result.unwrap_err(),
            OciChatError::UnknownProvider("mistral".to_string())
        );
    }

    #[tokio::test]
    async fn test_structured_output_parses_schema_tool_call() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Person {
            name: String,
            age: i64,
        }

        let mut stub = StubClient::with_text("");
        let mut parameters = Map::new();
        parameters.insert("name".to_string(), json!("Ada"));
        parameters.insert("age".to_string(), json!(36));
        stub.envelope.data.chat_response.tool_calls = Some(vec![RawToolCall {
            name: "person".to_string(),
            parameters,
        }]);
        let chat = OciGenAiChat::with_client(config(), Arc::new(stub));

        let schema = ToolDefinition::Schema(json!({
            "title": "person",
            "description": "A person record",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer"},
            },
        }));
        let structured = chat.with_structured_output::<Person>(&schema).unwrap();
        let person = structured
            .generate(&[Message::human("Describe Ada")], &CallOptions::new())
            .await
            .unwrap();

        assert_eq!(
            person,
            Person {
                name: "Ada".to_string(),
                age: 36
            }
        );
    }

    #[tokio::test]
    async fn test_structured_output_without_tool_call_reports_model_text() {
        let chat = OciGenAiChat::with_client(
            config(),
            Arc::new(StubClient::with_text("I cannot answer that.")),
        );

        let schema = ToolDefinition::Schema(json!({
            "title": "person",
            "description": "A person record",
            "properties": {"name": {"type": "string"}},
        }));
        let structured = chat
            .with_structured_output::<serde_json::Value>(&schema)
            .unwrap();
        let err = structured
            .generate(&[Message::human("hi")], &CallOptions::new())
            .await
            .unwrap_err();

        match err {
            OciChatError::Backend(msg) => assert!(msg.contains("I cannot answer that.")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
