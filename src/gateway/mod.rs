//! The command-execution gateway: validate a caller-supplied CLI sub-command,
//! shape it into a fully-qualified invocation, run it under fixed bounds, and
//! normalize the outcome.
//!
//! Only `Validation` rejections surface as errors; everything that happens to
//! the child process after validation is encoded in `ExecutionResult`.

pub mod capture;
pub mod executor;
pub mod provider;
pub mod validator;

pub use executor::{CommandExecutor, CommandRequest, ExecutionResult};
pub use provider::Provider;
pub use validator::{validate, ExecutionPolicy, ValidationOutcome};
