//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use axon_config::{Config, GatewayConfig, HealthConfig, ServerConfig, StoreConfig, UpstreamConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                },
                upstream: UpstreamConfig::default(),
                gateway: GatewayConfig::default(),
                store: StoreConfig::default(),
                mcp: axon_config::McpConfig::default(),
                telemetry: None,
            },
        }
    }

    /// Point the upstream provider at a mock backend
    pub fn with_upstream(mut self, base_url: &str) -> Self {
        self.config.upstream = UpstreamConfig {
            api_key: Some(SecretString::from("test-key")),
            base_url: Some(base_url.parse().expect("valid URL")),
            ..UpstreamConfig::default()
        };
        self
    }

    /// Cap the function calls allowed in one conversation
    pub fn with_max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.config.gateway.max_tool_calls = max_tool_calls;
        self
    }

    /// Declare registered tools to the provider
    pub fn advertising_tools(mut self) -> Self {
        self.config.gateway.advertise_registered_tools = true;
        self
    }

    /// Disable the response store
    pub fn without_store(mut self) -> Self {
        self.config.store.enabled = false;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
