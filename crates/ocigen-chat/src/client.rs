//! Backend client seam and the HTTP implementation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, error, trace};

use crate::error::OciChatError;
use crate::request::ChatDetails;
use crate::response::ChatResponseEnvelope;

/// Path of the chat action under the service endpoint.
pub const CHAT_API_PATH: &str = "/20231130/actions/chat";

/// One server-sent event from the streaming chat action.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// Raw JSON payload carried after the `data: ` prefix.
    pub data: String,
}

/// Stream of server-sent events from the backend.
pub type EventStream = BoxStream<'static, Result<SseEvent, OciChatError>>;

/// Transport used to reach the Generative AI inference API.
///
/// The chat model only needs these two calls, so tests can swap in a stub
/// and exercise the full translation path without a network.
#[async_trait]
pub trait GenAiClient: Send + Sync {
    /// Executes a chat call and returns the full response.
    async fn chat(&self, details: ChatDetails) -> Result<ChatResponseEnvelope, OciChatError>;

    /// Executes a chat call and returns the raw event stream.
    async fn chat_stream(&self, details: ChatDetails) -> Result<EventStream, OciChatError>;
}

/// Attaches authentication material to outgoing requests.
pub trait RequestSigner: Send + Sync {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, OciChatError>;
}

/// Signer that sends requests unchanged, for pre-authenticated channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

impl RequestSigner for NoopSigner {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, OciChatError> {
        Ok(request)
    }
}

/// Signer that adds a bearer token, for gateway or proxy deployments.
#[derive(Debug, Clone)]
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    pub fn new(token: impl Into<String>) -> Self {
        BearerSigner {
            token: token.into(),
        }
    }
}

impl RequestSigner for BearerSigner {
    fn sign(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, OciChatError> {
        Ok(request.bearer_auth(&self.token))
    }
}

/// HTTP client for the inference API.
pub struct HttpGenAiClient {
    client: Arc<Client>,
    service_endpoint: String,
    signer: Arc<dyn RequestSigner>,
}

impl HttpGenAiClient {
    /// Creates a client for a service endpoint with the default signer.
    pub fn new(service_endpoint: impl Into<String>) -> Result<Self, OciChatError> {
        Self::with_signer(service_endpoint, Arc::new(NoopSigner))
    }

    /// Creates a client with a custom request signer.
    pub fn with_signer(
        service_endpoint: impl Into<String>,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, OciChatError> {
        Self::with_client_and_signer(Arc::new(Client::new()), service_endpoint.into(), signer)
    }

    /// Creates a client with a custom HTTP client and request signer.
    pub fn with_client_and_signer(
        client: Arc<Client>,
        service_endpoint: String,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, OciChatError> {
        if service_endpoint.is_empty() {
            return Err(OciChatError::ProviderUnavailable(
                "service endpoint is required".to_string(),
            ));
        }

        Ok(HttpGenAiClient {
            client,
            service_endpoint,
            signer,
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}{}",
            self.service_endpoint.trim_end_matches('/'),
            CHAT_API_PATH
        )
    }

    async fn send(&self, details: &ChatDetails) -> Result<reqwest::Response, OciChatError> {
        let request = self
            .client
            .post(self.chat_url())
            .header("Content-Type", "application/json")
            .json(details);
        let request = self.signer.sign(request)?;

        let response = request.send().await.map_err(|e| {
            error!("OCI GenAI API request failed: {}", e);
            OciChatError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OCI GenAI API error ({}): {}", status, error_text);

            return Err(OciChatError::Backend(format!(
                "OCI GenAI API error: {} - {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl GenAiClient for HttpGenAiClient {
    async fn chat(&self, details: ChatDetails) -> Result<ChatResponseEnvelope, OciChatError> {
        debug!("Sending chat request to {}", self.chat_url());

        let response = self.send(&details).await?;
        let request_id = header_string(&response, "opc-request-id");
        let content_length = response.content_length();
        let data = response.json().await?;

        Ok(ChatResponseEnvelope {
            data,
            request_id,
            content_length,
        })
    }

    async fn chat_stream(&self, details: ChatDetails) -> Result<EventStream, OciChatError> {
        debug!("Starting streaming chat request to {}", self.chat_url());

        let response = self.send(&details).await?;
        let mut body = response.bytes_stream();

        // SSE frames arrive as "data: <json>\n"; a "[DONE]" payload or the
        // end of the body closes the stream.
        let events = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(OciChatError::Network(e.to_string()));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline);

                    if let Some(json_str) = line.strip_prefix("data: ") {
                        if json_str.trim() == "[DONE]" {
                            trace!("Stream completed with [DONE] marker");
                            return;
                        }
                        yield Ok(SseEvent {
                            data: json_str.to_string(),
                        });
                    }
                }
            }

            // A final frame without a trailing newline still counts.
            let line = buffer.trim_end_matches('\r');
            if let Some(json_str) = line.strip_prefix("data: ") {
                if json_str.trim() != "[DONE]" {
                    yield Ok(SseEvent {
                        data: json_str.to_string(),
                    });
                }
            }
        };

        Ok(events.boxed())
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
