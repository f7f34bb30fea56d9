//! Route handlers for the HTTP transport

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::server::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
    code: String,
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            code: code.to_string(),
            error: message.into(),
        }),
    )
        .into_response()
}

/// `POST /mcp`: one JSON-RPC message per request, answered with JSON.
/// Notifications are acknowledged with `202 Accepted` and no body.
pub async fn mcp_post(State(state): State<AppState>, body: String) -> Response {
    match state.mcp.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// The server is stateless: no server-initiated stream and no sessions.
pub async fn mcp_stream_unsupported() -> Response {
    let mut response = error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        "This MCP endpoint is stateless; send JSON-RPC messages with POST",
    );
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
    response
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
