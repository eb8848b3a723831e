#![allow(clippy::must_use_candidate)]

mod env;
pub mod gateway;
mod loader;
pub mod mcp;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use gateway::*;
pub use mcp::*;
pub use server::*;
pub use store::*;
pub use telemetry::TelemetryConfig;
pub use upstream::*;

/// Top-level Axon configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat-completion provider the gateway translates into
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Tool-loop limits and timeouts
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Response persistence
    #[serde(default)]
    pub store: StoreConfig,
    /// MCP servers whose tools the gateway may execute
    #[serde(default)]
    pub mcp: McpConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
