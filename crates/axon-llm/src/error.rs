use axon_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the upstream provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Upstream provider returned an error or could not be reached
    #[error("upstream error: {message}")]
    Upstream {
        /// Status returned by the provider, if a response was received
        status: Option<StatusCode>,
        /// Provider-supplied message
        message: String,
        /// Provider-supplied error code
        code: Option<String>,
    },

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Upstream failure with no HTTP status (connect, decode)
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
            code: None,
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { status: Some(status), .. } if status.is_client_error() || status.is_server_error() => {
                *status
            }
            Self::Upstream { .. } | Self::Streaming(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Upstream { .. } => "upstream_error",
            Self::Streaming(_) => "streaming_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn error_code(&self) -> Option<&str> {
        match self {
            Self::Upstream { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
