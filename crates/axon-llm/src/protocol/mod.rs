//! Wire format types for the upstream chat-completion protocol
//!
//! Pure serde structs matching the provider's JSON API. The response
//! gateway builds these directly from caller requests.

pub mod chat;
