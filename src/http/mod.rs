//! HTTP transport for MCP: JSON-RPC over POST, for web-based clients.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::protocol::JsonRpcRequest;
use crate::mcp::server::McpServer;

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
}

/// Serve MCP over HTTP until the process shuts down.
pub async fn start_server(config: &Config, server: Arc<McpServer>) -> Result<()> {
    let state = HttpState { server };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/mcp", post(rpc))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("127.0.0.1:{}", config.port);
    info!("Starting MCP HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn rpc(
    State(state): State<HttpState>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let response = state.server.handle_request(request).await;
    (StatusCode::OK, Json(response))
}
