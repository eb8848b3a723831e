//! Provider trait and the upstream implementation

pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use axon_core::RequestContext;
use futures_util::Stream;

use crate::error::LlmError;
use crate::protocol::chat::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

/// Ordered chunks of one streamed completion
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LlmError>> + Send>>;

/// Trait implemented by each chat-completion backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Send a non-streaming completion request
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
    ) -> Result<ChatCompletionResponse, LlmError>;

    /// Send a streaming completion request
    ///
    /// The stream ends after the provider's terminal marker.
    async fn complete_stream(
        &self,
        request: &ChatCompletionRequest,
        context: &RequestContext,
    ) -> Result<ChunkStream, LlmError>;
}
