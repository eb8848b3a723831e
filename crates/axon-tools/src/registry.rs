//! Name-based lookup and execution over native and MCP tools

use std::sync::Arc;

use async_trait::async_trait;
use axon_config::McpConfig;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::mcp::McpTools;
use crate::native::NativeTool;

/// Where a registered tool runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSource {
    /// Inside the gateway process
    Native,
    /// On the named MCP server
    Mcp { server: String },
}

/// Description of a registered tool
#[derive(Debug, Clone)]
pub struct ToolHandle {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
    pub source: ToolSource,
}

/// Lookup and execution of gateway-executable tools
///
/// A function call whose name has no handle here is returned to the caller
/// as a pending call instead of being executed.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Find a tool by the name the model called it with
    fn lookup(&self, name: &str) -> Option<ToolHandle>;

    /// Execute a tool with its raw JSON-encoded arguments
    async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError>;

    /// Every registered tool
    fn handles(&self) -> Vec<ToolHandle>;
}

/// Registry combining native tools with MCP-hosted tools
///
/// Native tools shadow MCP tools with the same name.
#[derive(Default)]
pub struct Registry {
    native: IndexMap<String, Arc<dyn NativeTool>>,
    mcp: Option<McpTools>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to the configured MCP servers and register their tools
    pub async fn from_config(config: &McpConfig) -> Self {
        if config.servers.is_empty() {
            return Self::new();
        }

        Self::new().with_mcp(McpTools::connect(config).await)
    }

    #[must_use]
    pub fn with_native(mut self, tool: Arc<dyn NativeTool>) -> Self {
        self.register(tool);
        self
    }

    #[must_use]
    pub fn with_mcp(mut self, tools: McpTools) -> Self {
        self.mcp = Some(tools);
        self
    }

    /// Register a native tool, replacing any existing tool with the same name
    pub fn register(&mut self, tool: Arc<dyn NativeTool>) {
        let name = tool.name().to_string();
        if self.native.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "native tool registered twice, keeping the latest");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty() && self.mcp.as_ref().is_none_or(|mcp| mcp.tools().is_empty())
    }
}

#[async_trait]
impl ToolRegistry for Registry {
    fn lookup(&self, name: &str) -> Option<ToolHandle> {
        if let Some(tool) = self.native.get(name) {
            return Some(native_handle(tool.as_ref()));
        }

        self.mcp.as_ref()?.find(name).map(|tool| ToolHandle {
            name: tool.qualified_name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
            source: ToolSource::Mcp {
                server: tool.server_name.clone(),
            },
        })
    }

    async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let arguments = parse_arguments(arguments)?;

        if let Some(tool) = self.native.get(name) {
            tracing::debug!(tool = name, "executing native tool");
            return tool.call(Value::Object(arguments)).await;
        }

        match &self.mcp {
            Some(mcp) => {
                tracing::debug!(tool = name, "executing MCP tool");
                mcp.call(name, Some(arguments)).await
            }
            None => Err(ToolError::NotFound { name: name.to_string() }),
        }
    }

    fn handles(&self) -> Vec<ToolHandle> {
        let mut handles: Vec<ToolHandle> = self.native.values().map(|tool| native_handle(tool.as_ref())).collect();

        if let Some(mcp) = &self.mcp {
            handles.extend(
                mcp.tools()
                    .iter()
                    .filter(|tool| !self.native.contains_key(&tool.qualified_name))
                    .map(|tool| ToolHandle {
                        name: tool.qualified_name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema.clone(),
                        source: ToolSource::Mcp {
                            server: tool.server_name.clone(),
                        },
                    }),
            );
        }

        handles
    }
}

fn native_handle(tool: &dyn NativeTool) -> ToolHandle {
    ToolHandle {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters(),
        source: ToolSource::Native,
    }
}

/// Decode a model-produced argument string into a JSON object
///
/// Models frequently send an empty string for tools without parameters.
fn parse_arguments(raw: &str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::InvalidArguments(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
    }
}
