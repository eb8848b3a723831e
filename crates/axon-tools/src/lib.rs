//! Executable tools for the Axon response gateway
//!
//! A [`ToolRegistry`] answers two questions for the tool loop: is a called
//! function something the gateway can run itself, and what does running it
//! return. [`Registry`] combines in-process [`NativeTool`]s with tools
//! hosted on configured MCP servers.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod access;
pub mod error;
pub mod mcp;
pub mod native;
pub mod registry;

pub use error::ToolError;
pub use native::{FnTool, NativeTool};
pub use registry::{Registry, ToolHandle, ToolRegistry, ToolSource};
