//! Cloudgate: GCP and Azure operations exposed as MCP tools.
//! Free-form CLI sub-commands pass a denylist, run as bounded child
//! processes, and come back as a uniform `{stdout, stderr, exitCode}` result.
//! The same tool router serves stdio MCP, streamable-HTTP MCP, and REST.

pub mod config;
pub mod error;
pub mod gateway;
pub mod server;
pub mod storage;
pub mod tools;

pub use config::{
    parse_env_ref, resolve_config_path, resolve_scope, ExecutionMode, GatewayConfig,
    CONFIG_FILE_NAME,
};
pub use error::{GatewayError, Result};
pub use gateway::{
    validate, CommandExecutor, CommandRequest, ExecutionPolicy, ExecutionResult, Provider,
    ValidationOutcome,
};
pub use server::GatewayMcpServer;
pub use storage::{ClientFactory, ObjectStore, StoreFactory};
pub use tools::{ToolName, ToolResponse, ToolRouter};
