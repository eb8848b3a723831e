//! Test server wrapper that starts Axon on a random port

use std::net::SocketAddr;
use std::sync::Arc;

use axon_config::Config;
use axon_server::Server;
use axon_tools::NativeTool;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        Self::start_with_tools(config, Vec::new()).await
    }

    /// Start a test server that executes the given in-process tools
    pub async fn start_with_tools(config: Config, tools: Vec<Arc<dyn NativeTool>>) -> anyhow::Result<Self> {
        let server = Server::with_native_tools(config, tools).await?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `POST /v1/responses` with a JSON body
    pub async fn create_response(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/v1/responses"))
            .json(body)
            .send()
            .await
            .expect("request to test server")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
