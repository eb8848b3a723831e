use std::collections::HashMap;

use axon_config::{McpAccessConfig, McpServerConfig};
use indexmap::IndexMap;

/// Tool-level access rules based on allow/deny lists
///
/// Applied when MCP tools are aggregated, so a denied tool is never
/// registered and calls to it are returned to the caller unresolved.
#[derive(Debug, Default)]
pub struct AccessController {
    /// Per-server access rules keyed by server name
    rules: HashMap<String, McpAccessConfig>,
}

impl AccessController {
    /// Build from MCP server configuration
    pub fn new(servers: &IndexMap<String, McpServerConfig>) -> Self {
        let rules = servers
            .iter()
            .filter_map(|(name, config)| config.access.as_ref().map(|access| (name.clone(), access.clone())))
            .collect();

        Self { rules }
    }

    /// Whether a server's tool may be registered
    ///
    /// Deny takes precedence over allow. If no rules are configured
    /// for the server, all tools are accessible.
    pub fn allows(&self, server_name: &str, tool_name: &str) -> bool {
        let Some(access) = self.rules.get(server_name) else {
            return true;
        };

        if access.deny.iter().any(|d| d == tool_name) {
            return false;
        }

        access.allow.is_empty() || access.allow.iter().any(|a| a == tool_name)
    }
}
