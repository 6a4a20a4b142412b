//! Command validation for caller-supplied CLI sub-commands.
//!
//! Deny-first prefix matching against the provider denylist, plus a GCP-only
//! structural rule that keeps the output-formatting language from being used
//! to evaluate expressions. Validation never looks at command semantics.

use std::fmt;
use std::time::Duration;

use crate::config::ExecutionMode;
use crate::gateway::provider::Provider;

/// Token that introduces a gcloud output-format specification.
const FORMAT_TOKEN: &str = "--format";

/// Token that invokes expression evaluation inside a format specification.
const EVAL_TOKEN: &str = "eval";

/// Immutable execution bounds shared by every invocation in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Wall-clock limit for a single child process.
    pub timeout: Duration,
    /// Limit on stdout + stderr bytes combined.
    pub max_output_bytes: usize,
    pub mode: ExecutionMode,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_output_bytes: 10 * 1024 * 1024,
            mode: ExecutionMode::Argv,
        }
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Input was empty or whitespace-only.
    Empty,
    /// Normalized command starts with a denylisted token.
    Denied { provider: Provider, token: &'static str },
    /// GCP format specifier combined with an evaluation token.
    FormatEval,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => f.write_str("empty command"),
            Rejection::Denied { provider, token } => write!(
                f,
                "'{}' commands are not permitted for {}",
                token,
                provider.display_name()
            ),
            Rejection::FormatEval => f.write_str(
                "format expressions combined with eval are not permitted",
            ),
        }
    }
}

/// Result of validating a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub permitted: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    fn permitted() -> Self {
        Self {
            permitted: true,
            reason: None,
        }
    }

    fn rejected(rejection: Rejection) -> Self {
        Self {
            permitted: false,
            reason: Some(rejection.to_string()),
        }
    }
}

/// Check whether a command is allowed, returning the structured rejection.
///
/// Evaluation order:
/// 1. Empty / whitespace-only input
/// 2. Denylist prefix on the trimmed, lowercased text
/// 3. GCP only: `--format` together with `eval`
pub fn check(provider: Provider, raw_command: &str) -> std::result::Result<(), Rejection> {
    let normalized = raw_command.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(Rejection::Empty);
    }

    if let Some(token) = provider
        .denylist()
        .iter()
        .copied()
        .find(|token| normalized.starts_with(token))
    {
        return Err(Rejection::Denied { provider, token });
    }

    if provider == Provider::Gcp
        && normalized.contains(FORMAT_TOKEN)
        && normalized.contains(EVAL_TOKEN)
    {
        return Err(Rejection::FormatEval);
    }

    Ok(())
}

/// Decide whether `raw_command` may be executed for `provider`.
///
/// Pure and deterministic; the raw string is only inspected, never rewritten.
pub fn validate(provider: Provider, raw_command: &str) -> ValidationOutcome {
    match check(provider, raw_command) {
        Ok(()) => ValidationOutcome::permitted(),
        Err(rejection) => ValidationOutcome::rejected(rejection),
    }
}
