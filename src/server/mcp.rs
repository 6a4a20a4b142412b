//! GatewayMcpServer: rmcp `ServerHandler` over the tool router.
//!
//! Used for both the stdio transport and the streamable-HTTP service. Tool
//! calls never produce a protocol error; failures come back as a
//! `CallToolResult` with `is_error` set.

use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::ErrorData as McpError;

use crate::tools::ToolRouter;

/// MCP server backed by a [`ToolRouter`]. Clones share the router, so the
/// streamable-HTTP factory can hand one to every session.
#[derive(Clone)]
pub struct GatewayMcpServer {
    router: ToolRouter,
}

impl GatewayMcpServer {
    pub fn new(router: ToolRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }
}

impl ServerHandler for GatewayMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: rmcp::model::Implementation {
                name: "cloudgate".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Cloudgate exposes GCP and Azure operations as tools. Free-form commands go \
                 through gcp_run_command / azure_run_command and are checked against a denylist."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.router.list_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(tool = %request.name, "MCP tool call");
        let response = self.router.dispatch(&request.name, request.arguments).await;
        Ok(response.into_call_tool_result())
    }
}
