use std::borrow::Cow;
use std::sync::Arc;

use axon_config::{HttpConfig, McpServerType, StdioConfig};
use rmcp::model::{CallToolRequestParam, CallToolResult, Tool};
use rmcp::service::{RoleClient, RunningService, ServiceExt as _};
use rmcp::transport::TokioChildProcess;
use secrecy::ExposeSecret;
use tokio::sync::Mutex;

use crate::error::ToolError;

type Service = RunningService<RoleClient, ()>;

/// Connected MCP server wrapping a running rmcp service
pub struct McpClient {
    service: Mutex<Service>,
    server_name: String,
    server_config: McpServerType,
}

impl McpClient {
    /// Connect to an MCP server
    pub async fn connect(name: &str, server_type: &McpServerType) -> Result<Self, ToolError> {
        let service = open(server_type).await?;

        tracing::info!(server = name, "connected to MCP server");

        Ok(Self {
            service: Mutex::new(service),
            server_name: name.to_string(),
            server_config: server_type.clone(),
        })
    }

    /// List all tools available on this server
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ToolError> {
        self.service
            .lock()
            .await
            .list_all_tools()
            .await
            .map_err(|e| ToolError::Transport(format!("list_tools failed on {}: {e}", self.server_name)))
    }

    /// Call a tool on this server, reconnecting once on transport failure
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, ToolError> {
        let request = |arguments| CallToolRequestParam {
            name: Cow::Owned(name.to_string()),
            arguments,
        };

        let mut guard = self.service.lock().await;

        match guard.call_tool(request(arguments.clone())).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                tracing::warn!(server = %self.server_name, tool = name, error = %e, "MCP call failed, reconnecting");
            }
        }

        *guard = open(&self.server_config).await?;

        guard.call_tool(request(arguments)).await.map_err(|e| {
            ToolError::Transport(format!(
                "tool '{name}' failed on {} after reconnect: {e}",
                self.server_name
            ))
        })
    }
}

async fn open(server_type: &McpServerType) -> Result<Service, ToolError> {
    match server_type {
        McpServerType::Stdio(config) => open_stdio(config).await,
        McpServerType::Sse(config) => open_sse(config).await,
        McpServerType::StreamableHttp(config) => open_streamable_http(config).await,
    }
}

async fn open_stdio(config: &StdioConfig) -> Result<Service, ToolError> {
    let mut cmd = tokio::process::Command::new(&config.command);
    cmd.args(&config.args).envs(&config.env);

    let transport =
        TokioChildProcess::new(cmd).map_err(|e| ToolError::Transport(format!("failed to spawn process: {e}")))?;

    ().serve(transport)
        .await
        .map_err(|e| ToolError::Transport(format!("STDIO handshake failed: {e}")))
}

async fn open_sse(config: &HttpConfig) -> Result<Service, ToolError> {
    use rmcp::transport::SseClientTransport;
    use rmcp::transport::sse_client::SseClientConfig;

    let sse_config = SseClientConfig {
        sse_endpoint: Arc::from(config.url.as_str()),
        ..Default::default()
    };

    let transport = SseClientTransport::start_with_client(http_client(config)?, sse_config)
        .await
        .map_err(|e| ToolError::Transport(format!("SSE connection failed: {e}")))?;

    ().serve(transport)
        .await
        .map_err(|e| ToolError::Transport(format!("SSE handshake failed: {e}")))
}

async fn open_streamable_http(config: &HttpConfig) -> Result<Service, ToolError> {
    use rmcp::transport::StreamableHttpClientTransport;
    use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;

    let mut transport_config = StreamableHttpClientTransportConfig::with_uri(config.url.as_str());

    if let Some(token) = &config.token {
        transport_config = transport_config.auth_header(format!("Bearer {}", token.expose_secret()));
    }

    let transport = StreamableHttpClientTransport::with_client(reqwest::Client::new(), transport_config);

    ().serve(transport)
        .await
        .map_err(|e| ToolError::Transport(format!("StreamableHTTP handshake failed: {e}")))
}

/// Build a reqwest client carrying the configured bearer token
fn http_client(config: &HttpConfig) -> Result<reqwest::Client, ToolError> {
    let mut builder = reqwest::Client::builder();

    if let Some(token) = &config.token {
        let mut headers = reqwest::header::HeaderMap::new();
        let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| ToolError::Transport(format!("invalid auth token: {e}")))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);
        builder = builder.default_headers(headers);
    }

    builder
        .build()
        .map_err(|e| ToolError::Transport(format!("failed to build HTTP client: {e}")))
}
