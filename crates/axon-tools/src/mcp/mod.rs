//! Tools hosted on MCP servers

mod client;

use std::collections::HashMap;

use axon_config::McpConfig;
use rmcp::model::{CallToolResult, RawContent};

pub use client::McpClient;

use crate::access::AccessController;
use crate::error::ToolError;

/// Separator between server name and tool name
const TOOL_SEPARATOR: &str = "__";

/// Tool descriptor with server origin
#[derive(Debug, Clone)]
pub struct McpTool {
    /// Fully qualified name: `server_name__tool_name`
    pub qualified_name: String,
    /// Original tool name on the MCP server
    pub original_name: String,
    /// Server this tool belongs to
    pub server_name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for tool input
    pub input_schema: serde_json::Value,
}

/// Connections to every configured MCP server and their permitted tools
#[derive(Default)]
pub struct McpTools {
    clients: HashMap<String, McpClient>,
    tools: Vec<McpTool>,
}

impl McpTools {
    /// Connect to all configured MCP servers and aggregate their tools
    ///
    /// Servers that fail to connect are logged and skipped rather than
    /// causing startup failure.
    pub async fn connect(config: &McpConfig) -> Self {
        let access = AccessController::new(&config.servers);
        let mut clients = HashMap::new();
        let mut tools = Vec::new();

        for (name, server_config) in &config.servers {
            let client = match McpClient::connect(name, &server_config.server_type).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!(server = name, error = %e, "failed to connect to MCP server, skipping");
                    continue;
                }
            };

            match client.list_tools().await {
                Ok(server_tools) => {
                    tools.extend(
                        server_tools
                            .into_iter()
                            .filter(|tool| access.allows(name, &tool.name))
                            .map(|tool| McpTool {
                                qualified_name: qualify(name, &tool.name),
                                original_name: tool.name.to_string(),
                                server_name: name.clone(),
                                description: tool.description.as_deref().unwrap_or_default().to_string(),
                                input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
                            }),
                    );
                }
                Err(e) => {
                    tracing::warn!(server = name, error = %e, "failed to list tools from MCP server");
                }
            }

            clients.insert(name.clone(), client);
        }

        tracing::info!(servers = clients.len(), tools = tools.len(), "MCP tools registered");

        Self { clients, tools }
    }

    /// All permitted tools
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Find a permitted tool by qualified name
    pub fn find(&self, qualified_name: &str) -> Option<&McpTool> {
        self.tools.iter().find(|tool| tool.qualified_name == qualified_name)
    }

    /// Call a tool by its qualified name and flatten the result to text
    pub async fn call(
        &self,
        qualified_name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String, ToolError> {
        let tool = self.find(qualified_name).ok_or_else(|| ToolError::NotFound {
            name: qualified_name.to_string(),
        })?;

        let client = self.clients.get(&tool.server_name).ok_or_else(|| ToolError::NotFound {
            name: qualified_name.to_string(),
        })?;

        let result = client.call_tool(&tool.original_name, arguments).await?;
        result_text(result)
    }
}

/// Qualified name under which a server's tool is registered
pub fn qualify(server_name: &str, tool_name: &str) -> String {
    format!("{server_name}{TOOL_SEPARATOR}{tool_name}")
}

/// Flatten MCP content blocks into one tool output string
fn result_text(result: CallToolResult) -> Result<String, ToolError> {
    let text = result
        .content
        .into_iter()
        .map(|content| match content.raw {
            RawContent::Text(t) => t.text,
            other => serde_json::to_string(&other).unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error == Some(true) {
        return Err(ToolError::Execution(text));
    }

    Ok(text)
}
