//! `OpenAI` Responses API on top of a chat-completion provider
//!
//! Requests are converted to chat completions, provider results are
//! converted back into response envelopes or stream events, and function
//! calls to tools registered with the gateway are executed between
//! provider iterations. Calls to tools the gateway does not know are
//! returned to the caller unresolved.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod aggregator;
pub mod convert;
mod error;
mod gateway;
mod handler;
pub mod ids;
pub mod orchestrator;
pub mod protocol;
pub mod store;

pub use error::ResponsesError;
pub use gateway::{Gateway, GatewayBuilder, GatewayLimits, ResponseEventStream};
pub use handler::responses_router;
pub use store::{InMemoryStore, ResponseStore};
