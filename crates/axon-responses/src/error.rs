//! Error taxonomy for the Responses gateway

use std::time::Duration;

use axon_core::HttpError;
use axon_llm::LlmError;
use http::StatusCode;
use thiserror::Error;

/// Errors raised while producing a response
#[derive(Debug, Error)]
pub enum ResponsesError {
    /// The request cannot be expressed as a chat completion
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The conversation holds more function calls than allowed
    #[error("too many tool calls: {count} exceeds the limit of {limit}")]
    TooManyToolCalls { limit: usize, count: usize },

    /// The response did not finish in time
    #[error("response timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The upstream provider failed
    #[error(transparent)]
    Upstream(#[from] LlmError),

    /// No stored response has this id
    #[error("response not found: {0}")]
    NotFound(String),

    /// Responses are not persisted by this gateway
    #[error("response storage is disabled")]
    StoreDisabled,

    /// The caller stopped reading the stream
    #[error("client disconnected")]
    Disconnected,
}

impl ResponsesError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Code carried by the `error` event of a failed stream
    pub fn event_code(&self) -> String {
        self.error_code().unwrap_or_else(|| self.error_type()).to_owned()
    }
}

impl HttpError for ResponsesError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::TooManyToolCalls { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Upstream(e) => e.status_code(),
            Self::NotFound(_) | Self::StoreDisabled => StatusCode::NOT_FOUND,
            Self::Disconnected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "invalid_request_error",
            Self::TooManyToolCalls { .. } => "too_many_tool_calls",
            Self::Timeout(_) => "timeout",
            Self::Upstream(e) => e.error_type(),
            Self::NotFound(_) | Self::StoreDisabled => "not_found_error",
            Self::Disconnected => "client_disconnected",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Upstream(e) => e.client_message(),
            other => other.to_string(),
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::TooManyToolCalls { .. } => Some("too_many_tool_calls"),
            Self::Timeout(_) => Some("timeout"),
            Self::Upstream(e) => e.error_code(),
            _ => None,
        }
    }
}
