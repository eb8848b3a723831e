//! Identifier generation for responses and output items

use uuid::Uuid;

fn prefixed(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

pub fn response_id() -> String {
    prefixed("resp")
}

pub fn message_id() -> String {
    prefixed("msg")
}

pub fn reasoning_id() -> String {
    prefixed("rs")
}

pub fn function_call_id() -> String {
    prefixed("fc")
}

pub fn function_output_id() -> String {
    prefixed("fco")
}

/// Call id for provider tool calls that arrive without one
pub fn call_id() -> String {
    prefixed("call")
}

/// Current Unix time in seconds
pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
