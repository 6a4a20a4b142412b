//! Error types for Cloudgate operations.
//!
//! External-process failures are deliberately absent: a CLI that exits
//! non-zero, times out, or cannot be spawned is reported through
//! `ExecutionResult`, never through `GatewayError`.

use thiserror::Error;

/// Main error type for Cloudgate operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Command denied by the validator before anything was spawned
    #[error("Command rejected: {0}")]
    Validation(String),

    /// A required tool argument is absent (payload is the human-readable label)
    #[error("{0} is required")]
    MissingArgument(&'static str),

    /// A tool argument is present but unusable
    #[error("invalid argument '{0}': {1}")]
    InvalidArgument(&'static str, String),

    /// An SDK-style collaborator call failed (permissions, not-found, transport)
    #[error("Failed to {operation}: {message}")]
    Collaborator { operation: String, message: String },

    /// Tool name does not map to any catalogue entry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Configuration rejected at startup
    #[error("invalid config for '{0}': {1}")]
    InvalidConfig(String, String),

    /// Front-end transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Wrap a collaborator failure with the operation it interrupted.
    pub fn collaborator(operation: impl Into<String>, message: impl ToString) -> Self {
        GatewayError::Collaborator {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for Cloudgate operations
pub type Result<T> = std::result::Result<T, GatewayError>;
