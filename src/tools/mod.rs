//! ToolRouter: the single seam between front-ends and the gateway.
//!
//! Every front-end hands a tool name plus an arguments object to
//! [`ToolRouter::dispatch`] and relays the returned [`ToolResponse`]
//! verbatim. `dispatch` never fails: handler errors are converted into an
//! `isError` envelope exactly once, here.

pub mod args;
pub mod azure;
pub mod catalog;
pub mod gcp;

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, Tool};
use serde::{Deserialize, Serialize};

use crate::config::{resolve_scope, GatewayConfig};
use crate::error::GatewayError;
use crate::gateway::{CommandExecutor, CommandRequest, ExecutionResult, Provider};
use crate::storage::{ClientFactory, StoreFactory};

pub use args::Args;
pub use catalog::ToolName;

/// One text block of a tool response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// The uniform result of every tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Pretty-printed JSON body.
    pub fn json<T: Serialize>(value: &T) -> crate::Result<Self> {
        serde_json::to_string_pretty(value)
            .map(Self::text)
            .map_err(|e| GatewayError::Transport(format!("could not serialize response: {}", e)))
    }

    /// `{stdout, stderr, exitCode}` with `isError` set for non-zero exits.
    pub fn from_execution(result: &ExecutionResult) -> Self {
        let text = serde_json::to_string(result).unwrap_or_default();
        Self {
            is_error: !result.is_success(),
            ..Self::text(text)
        }
    }

    pub fn error(err: &GatewayError) -> Self {
        Self {
            is_error: true,
            ..Self::text(format!("Error: {}", err))
        }
    }

    /// All text blocks joined by newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_call_tool_result(self) -> CallToolResult {
        CallToolResult {
            content: self.content.into_iter().map(|c| Content::text(c.text)).collect(),
            is_error: Some(self.is_error),
            structured_content: None,
            meta: None,
        }
    }
}

/// Shared collaborators handed to every handler.
pub struct ToolContext {
    pub executor: CommandExecutor,
    pub stores: Arc<dyn StoreFactory>,
    /// Fallback for `projectId`.
    pub gcp_project: Option<String>,
    /// Fallback for `subscriptionId`.
    pub azure_subscription: Option<String>,
}

impl ToolContext {
    /// The caller's project/subscription, or the configured default.
    pub(crate) fn scope<'a>(&'a self, provider: Provider, args: &'a Args) -> Option<&'a str> {
        let (key, fallback) = match provider {
            Provider::Gcp => ("projectId", &self.gcp_project),
            Provider::Azure => ("subscriptionId", &self.azure_subscription),
        };
        args::optional_str(args, key).or(fallback.as_deref())
    }

    /// Like [`scope`](Self::scope), for commands the gateway builds itself.
    pub(crate) fn checked_scope<'a>(
        &'a self,
        provider: Provider,
        args: &'a Args,
    ) -> crate::Result<Option<&'a str>> {
        let key = match provider {
            Provider::Gcp => "projectId",
            Provider::Azure => "subscriptionId",
        };
        self.scope(provider, args)
            .map(|scope| args::safe_token(key, scope, false))
            .transpose()
    }

    /// Run gateway-built sub-commands in order and report each one.
    ///
    /// Later steps still run when an earlier one fails, and nothing is
    /// rolled back.
    pub(crate) async fn run_steps(
        &self,
        provider: Provider,
        scope: Option<&str>,
        steps: Vec<(&'static str, String)>,
    ) -> ToolResponse {
        let mut lines = Vec::with_capacity(steps.len());
        let mut failed = false;

        for (index, (label, command)) in steps.into_iter().enumerate() {
            let body = match self
                .executor
                .execute(provider, CommandRequest::new(command, scope))
                .await
            {
                Ok(result) => {
                    failed |= !result.is_success();
                    serde_json::to_string(&result).unwrap_or_default()
                }
                Err(err) => {
                    failed = true;
                    format!("Error: {}", err)
                }
            };
            lines.push(format!("Step {} ({}): {}", index + 1, label, body));
        }

        ToolResponse {
            is_error: failed,
            ..ToolResponse::text(lines.join("\n"))
        }
    }
}

/// Wrap a collaborator failure with the operation that was attempted.
/// Argument errors raised by the collaborator pass through unchanged.
pub(crate) fn collaborator(operation: &'static str) -> impl FnOnce(GatewayError) -> GatewayError {
    move |err| match err {
        GatewayError::MissingArgument(_) | GatewayError::InvalidArgument(..) => err,
        GatewayError::Transport(message) => GatewayError::collaborator(operation, message),
        other => GatewayError::collaborator(operation, other),
    }
}

/// Routes tool calls to their handlers. Cheap to clone.
#[derive(Clone)]
pub struct ToolRouter {
    ctx: Arc<ToolContext>,
}

impl ToolRouter {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Build the production router: one executor and one client factory for
    /// the process lifetime.
    pub fn from_config(config: &GatewayConfig) -> crate::Result<Self> {
        let executor = CommandExecutor::from_config(config);
        let stores = ClientFactory::new(config, executor.clone())?;
        Ok(Self::new(ToolContext {
            executor,
            stores: Arc::new(stores),
            gcp_project: resolve_scope(config.gcp.default_project.as_deref()),
            azure_subscription: resolve_scope(config.azure.default_subscription.as_deref()),
        }))
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        ToolName::all().iter().map(|tool| tool.descriptor()).collect()
    }

    /// Run a tool. Always returns an envelope; failures set `is_error`.
    pub async fn dispatch(&self, name: &str, arguments: Option<Args>) -> ToolResponse {
        let args = arguments.unwrap_or_default();
        match self.route(name, &args).await {
            Ok(response) => {
                tracing::debug!(tool = %name, is_error = response.is_error, "tool call finished");
                response
            }
            Err(err) => {
                tracing::warn!(tool = %name, error = %err, "tool call failed");
                ToolResponse::error(&err)
            }
        }
    }

    async fn route(&self, name: &str, args: &Args) -> crate::Result<ToolResponse> {
        let tool = ToolName::parse(name).ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        let ctx = self.ctx.as_ref();
        match tool {
            ToolName::GcpRunCommand => gcp::run_command(ctx, args).await,
            ToolName::GcpListBuckets => gcp::list_buckets(ctx, args).await,
            ToolName::GcpListObjects => gcp::list_objects(ctx, args).await,
            ToolName::GcpReadObject => gcp::read_object(ctx, args).await,
            ToolName::GcpGetObjectMetadata => gcp::object_metadata(ctx, args).await,
            ToolName::GcpListInstances => gcp::list_instances(ctx, args).await,
            ToolName::GcpStartInstance => gcp::set_power(ctx, args, "start").await,
            ToolName::GcpStopInstance => gcp::set_power(ctx, args, "stop").await,
            ToolName::GcpModifyInstance => gcp::modify_instance(ctx, args).await,
            ToolName::AzureRunCommand => azure::run_command(ctx, args).await,
            ToolName::AzureListContainers => azure::list_containers(ctx, args).await,
            ToolName::AzureListBlobs => azure::list_blobs(ctx, args).await,
            ToolName::AzureReadBlob => azure::read_blob(ctx, args).await,
            ToolName::AzureGetBlobProperties => azure::blob_properties(ctx, args).await,
            ToolName::AzureListVms => azure::list_vms(ctx, args).await,
            ToolName::AzureStartVm => azure::set_power(ctx, args, "start").await,
            ToolName::AzureStopVm => azure::set_power(ctx, args, "stop").await,
            ToolName::AzureModifyVm => azure::modify_vm(ctx, args).await,
        }
    }
}
