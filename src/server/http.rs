//! HTTP front-end: REST routes plus the streamable-HTTP MCP service.
//!
//! ```text
//! GET  /health            liveness
//! GET  /tools             tool descriptors
//! POST /tools/:tool_name  body = arguments object (optional)
//! POST /mcp/call          body = {"toolName" | "name", "arguments"}
//! *                       streamable-HTTP MCP (clients connect to /mcp)
//! ```
//!
//! Dispatch routes answer 200 with the tool envelope even when `isError` is
//! set; only an unreadable request body gets a 400.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::error::GatewayError;
use crate::server::mcp::GatewayMcpServer;
use crate::tools::{Args, ToolResponse, ToolRouter};

/// Body of `POST /mcp/call`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallRequest {
    #[serde(alias = "name")]
    tool_name: String,
    #[serde(default)]
    arguments: Option<Args>,
}

/// REST routes only.
pub fn routes(router: ToolRouter) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/:tool_name", post(call_named_tool))
        .route("/mcp/call", post(call_tool))
        .with_state(router)
}

/// REST routes with the streamable-HTTP MCP service as fallback.
pub fn app(router: ToolRouter, cancel: CancellationToken) -> Router {
    let server = GatewayMcpServer::new(router.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: cancel,
            ..Default::default()
        },
    );

    routes(router).fallback(move |req: Request<Body>| {
        let svc = mcp_service.clone();
        async move {
            match svc.oneshot(req).await {
                Ok(response) => response.into_response(),
                Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            }
        }
    })
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "cloudgate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_tools(State(router): State<ToolRouter>) -> impl IntoResponse {
    Json(json!({ "tools": router.list_tools() }))
}

async fn call_named_tool(
    State(router): State<ToolRouter>,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Response {
    let arguments = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Args>(&body) {
            Ok(arguments) => Some(arguments),
            Err(e) => return bad_request(format!("arguments must be a JSON object: {}", e)),
        }
    };
    Json(router.dispatch(&tool_name, arguments).await).into_response()
}

async fn call_tool(State(router): State<ToolRouter>, body: Bytes) -> Response {
    let request: CallRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(format!("expected {{\"toolName\", \"arguments\"}}: {}", e)),
    };
    Json(router.dispatch(&request.tool_name, request.arguments).await).into_response()
}

fn bad_request(detail: String) -> Response {
    let err = GatewayError::InvalidArgument("body", detail);
    (StatusCode::BAD_REQUEST, Json(ToolResponse::error(&err))).into_response()
}
