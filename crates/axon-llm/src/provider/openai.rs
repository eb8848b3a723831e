//! OpenAI-compatible provider implementation

use async_trait::async_trait;
use axon_config::UpstreamConfig;
use axon_core::RequestContext;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChunkStream, Provider};
use crate::error::LlmError;
use crate::protocol::chat::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatErrorResponse};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Terminal marker sent as the last SSE payload
const DONE_MARKER: &str = "[DONE]";

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    forward_authorization: bool,
}

impl OpenAiProvider {
    /// Create from upstream configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the default base URL cannot be parsed
    /// or the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, config: &UpstreamConfig) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| anyhow::anyhow!("invalid default base URL: {e}"))?,
        };

        let client = Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            name: name.into(),
            client,
            base_url,
            api_key: config.api_key.clone(),
            forward_authorization: config.forward_authorization,
        })
    }

    /// Resolve the API key from config or request context
    fn resolve_api_key<'a>(&'a self, context: &'a RequestContext) -> Option<&'a str> {
        // Prefer forwarded key from context
        if self.forward_authorization
            && let Some(key) = &context.api_key
        {
            return Some(key.expose_secret());
        }
        self.api_key.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    async fn send(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
    ) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.completions_url()).json(request);

        if let Some(key) = self.resolve_api_key(context) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "upstream request failed");
            LlmError::upstream(e.to_string())
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider = %self.name, status = %status, "upstream returned error");

        Err(upstream_error(status, &body))
    }
}

/// Map a non-2xx provider response, keeping its status and code
fn upstream_error(status: http::StatusCode, body: &str) -> LlmError {
    match serde_json::from_str::<ChatErrorResponse>(body) {
        Ok(parsed) => LlmError::Upstream {
            status: Some(status),
            message: parsed.error.message,
            code: parsed.error.code.map(error_code),
        },
        Err(_) => LlmError::Upstream {
            status: Some(status),
            message: format!("provider returned {status}: {body}"),
            code: None,
        },
    }
}

/// Decode one SSE payload
///
/// An error object sent mid-stream becomes an `Err` item; other unparseable
/// payloads are skipped.
fn parse_chunk(data: &str) -> Option<Result<ChatCompletionChunk, LlmError>> {
    let data = data.trim();
    let error = match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => return Some(Ok(chunk)),
        Err(e) => e,
    };

    if let Ok(parsed) = serde_json::from_str::<ChatErrorResponse>(data) {
        tracing::warn!(message = %parsed.error.message, "upstream sent an error mid-stream");
        return Some(Err(LlmError::Upstream {
            status: None,
            message: parsed.error.message,
            code: parsed.error.code.map(error_code),
        }));
    }

    tracing::debug!(error = %error, data = %data, "skipping unparseable SSE chunk");
    None
}

fn error_code(code: serde_json::Value) -> String {
    match code {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let response = self.send(request, context).await?;

        response
            .json()
            .await
            .map_err(|e| LlmError::upstream(format!("failed to parse response: {e}")))
    }

    async fn complete_stream(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.send(request, context).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .take_while(|result| {
                let done = matches!(result, Ok(event) if event.data.trim() == DONE_MARKER);
                futures_util::future::ready(!done)
            })
            .filter_map(|result| {
                let item = match result {
                    Ok(event) => parse_chunk(&event.data),
                    Err(e) => Some(Err(LlmError::Streaming(e.to_string()))),
                };
                futures_util::future::ready(item)
            });

        Ok(Box::pin(chunks))
    }
}
