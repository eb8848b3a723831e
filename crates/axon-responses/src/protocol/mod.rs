//! Wire types of the response protocol
//!
//! Requests, the response envelope and the streamed events, modelled on
//! the `OpenAI` Responses API.

pub mod events;
pub mod request;
pub mod response;

pub use events::{EventKind, StreamEvent};
pub use request::*;
pub use response::*;
