//! Web server implementation using Axum

use crate::mcp::McpServer;
use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::routes;

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind the web server
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: crate::config::DEFAULT_BIND.to_string(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: McpServer,
}

/// HTTP server exposing the MCP endpoint
pub struct WebServer {
    config: WebConfig,
    app_state: AppState,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: WebConfig, mcp: McpServer) -> Self {
        Self {
            config,
            app_state: AppState { mcp },
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/mcp",
                get(routes::mcp_stream_unsupported)
                    .post(routes::mcp_post)
                    .delete(routes::mcp_stream_unsupported),
            )
            .route("/health", get(routes::health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.app_state.clone())
    }

    /// Run the web server until Ctrl+C
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(&self.config.bind).await?;

        tracing::info!(bind = %self.config.bind, "Starting vapi-mcp HTTP server");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutting down");
        Ok(())
    }

    /// Get the bind address
    pub fn bind_address(&self) -> &str {
        &self.config.bind
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
