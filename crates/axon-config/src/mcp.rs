use std::collections::HashMap;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// MCP servers whose tools become executable by the gateway
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpConfig {
    /// MCP server configurations keyed by name
    #[serde(default)]
    pub servers: IndexMap<String, McpServerConfig>,
}

/// Configuration for a single MCP server
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpServerConfig {
    /// Server transport type
    #[serde(rename = "type")]
    pub server_type: McpServerType,
    /// Access control for this server
    #[serde(default)]
    pub access: Option<McpAccessConfig>,
}

/// MCP server transport types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum McpServerType {
    /// STDIO subprocess
    Stdio(StdioConfig),
    /// HTTP with SSE
    Sse(HttpConfig),
    /// HTTP with streamable protocol
    StreamableHttp(HttpConfig),
}

/// STDIO transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StdioConfig {
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Server URL
    pub url: Url,
    /// Static bearer token sent to the server
    #[serde(default)]
    pub token: Option<SecretString>,
}

/// Tool-level access rules for one server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpAccessConfig {
    /// Allowed tool names (if set, only these tools are registered)
    #[serde(default)]
    pub allow: Vec<String>,
    /// Denied tool names (never registered)
    #[serde(default)]
    pub deny: Vec<String>,
}
