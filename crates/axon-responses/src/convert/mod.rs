//! Translation between the response protocol and chat completions

mod reasoning;
mod request;
mod response;

pub use reasoning::{SplitText, split_reasoning};
pub use request::{advertise_tools, to_chat_request};
pub use response::{to_envelope, usage_from_chat};
