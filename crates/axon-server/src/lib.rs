mod health;
mod request_context;

use std::net::SocketAddr;
use std::sync::Arc;

use axon_config::Config;
use axon_responses::Gateway;
use axon_tools::{NativeTool, Registry};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider or the gateway limits are
    /// misconfigured
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_native_tools(config, Vec::new()).await
    }

    /// Build the server, registering in-process tools next to the
    /// configured MCP servers' tools
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider or the gateway limits are
    /// misconfigured
    pub async fn with_native_tools(config: Config, tools: Vec<Arc<dyn NativeTool>>) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let mut registry = Registry::from_config(&config.mcp).await;
        for tool in tools {
            registry.register(tool);
        }
        if registry.is_empty() {
            tracing::info!("no executable tools registered, every function call is returned to the caller");
        }

        let gateway = Gateway::from_config(&config, Arc::new(registry))?;

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        app = app.merge(axon_responses::responses_router(gateway));

        // Apply middleware layers (innermost first)
        app = app.layer(axum::middleware::from_fn(request_context::request_context_middleware));
        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
