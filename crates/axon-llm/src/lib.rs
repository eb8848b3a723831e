//! Upstream chat-completion client for Axon
//!
//! Holds the chat-completion wire format and the [`Provider`] abstraction
//! the response gateway translates into. Only the `OpenAI`-compatible
//! protocol is implemented.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod protocol;
pub mod provider;

pub use error::LlmError;
pub use provider::{ChunkStream, Provider};
