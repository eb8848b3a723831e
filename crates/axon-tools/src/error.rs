use thiserror::Error;

/// Tool lookup and execution errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// No registered tool has this name
    #[error("tool not found: {name}")]
    NotFound { name: String },

    /// Arguments are not a JSON object
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Transport-level connection or communication error
    #[error("transport error: {0}")]
    Transport(String),

    /// The tool ran and reported a failure
    #[error("{0}")]
    Execution(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
