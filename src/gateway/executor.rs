//! Command executor. Builds the provider invocation, runs it as a bounded
//! child process, and normalizes the outcome into an `ExecutionResult`.
//!
//! The executor never returns an error for anything the child process does.
//! Non-zero exits, timeouts, output overflow and spawn failures all become an
//! `ExecutionResult` with a non-zero `exit_code` and a non-empty `stderr`.
//! The only error path is a validator rejection, raised before spawning.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::{Child, Command};

use crate::config::{ExecutionMode, GatewayConfig};
use crate::error::GatewayError;
use crate::gateway::capture::{drain_bounded, Drain};
use crate::gateway::provider::Provider;
use crate::gateway::validator::{self, ExecutionPolicy};

/// A caller-supplied sub-command with an optional project/subscription scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub raw_command: String,
    pub scope_id: Option<String>,
}

impl CommandRequest {
    pub fn new(raw_command: impl Into<String>, scope_id: Option<&str>) -> Self {
        Self {
            raw_command: raw_command.into(),
            scope_id: scope_id.map(str::to_string),
        }
    }
}

/// Normalized outcome of one child process.
///
/// Serialized as `{"stdout", "stderr", "exitCode"}`, the text payload of
/// every executor-backed tool response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Build a failed result. `stderr` falls back to `diagnostic` when the
    /// process wrote nothing to it; a missing or zero code becomes 1.
    fn failure(stdout: String, stderr: String, code: Option<i32>, diagnostic: String) -> Self {
        let exit_code = code.filter(|c| *c != 0).unwrap_or(1);
        let stderr = if stderr.trim().is_empty() {
            diagnostic
        } else {
            stderr
        };
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Build the result for a run the gateway cut short. The diagnostic is
    /// appended to whatever the process already wrote to stderr.
    fn aborted(stdout: String, stderr: String, diagnostic: String) -> Self {
        let stderr = if stderr.trim().is_empty() {
            diagnostic
        } else {
            format!("{}\n{}", stderr.trim_end(), diagnostic)
        };
        Self {
            stdout,
            stderr,
            exit_code: 1,
        }
    }
}

/// Kill the child's process group, then the child itself.
///
/// `pgid` is captured at spawn, since `Child::id` is gone once the child
/// has been reaped while descendants may still be running.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) {
            if let Err(errno) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                tracing::debug!(pgid = %pgid, error = %errno, "process group already gone");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    let _ = child.kill().await;
}

/// How long output may keep arriving after the child has exited. A
/// descendant still holding the pipes past this is killed.
const EXIT_GRACE: Duration = Duration::from_millis(250);

/// How the bounded wait ended.
enum Finished {
    Exited(std::process::ExitStatus),
    Overflow,
}

/// Runs provider CLI invocations under the process-wide `ExecutionPolicy`.
///
/// Cheap to clone; holds no per-call state.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    policy: Arc<ExecutionPolicy>,
    gcp_program: String,
    azure_program: String,
}

impl CommandExecutor {
    /// Executor using the default `gcloud` / `az` programs.
    pub fn new(policy: ExecutionPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            gcp_program: Provider::Gcp.default_program().to_string(),
            azure_program: Provider::Azure.default_program().to_string(),
        }
    }

    /// Executor built from a validated config.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.execution_policy())
            .with_program(Provider::Gcp, &config.gcp.binary)
            .with_program(Provider::Azure, &config.azure.binary)
    }

    /// Override the CLI program used for a provider.
    pub fn with_program(mut self, provider: Provider, program: &str) -> Self {
        match provider {
            Provider::Gcp => self.gcp_program = program.to_string(),
            Provider::Azure => self.azure_program = program.to_string(),
        }
        self
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn program(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gcp => &self.gcp_program,
            Provider::Azure => &self.azure_program,
        }
    }

    /// The literal invocation text: `<program> <raw>` plus the scope flag.
    ///
    /// The raw command is not quoted or escaped; it is trusted verbatim once
    /// it has passed the validator.
    pub fn build_invocation(&self, provider: Provider, request: &CommandRequest) -> String {
        let mut invocation = format!("{} {}", self.program(provider), request.raw_command);
        if let Some(scope_id) = &request.scope_id {
            invocation.push(' ');
            invocation.push_str(&provider.scope_args(scope_id).join(" "));
        }
        invocation
    }

    /// Run a `gcloud` sub-command, optionally pinned to a project.
    pub async fn execute_gcp(
        &self,
        command: &str,
        project_id: Option<&str>,
    ) -> crate::Result<ExecutionResult> {
        self.execute(Provider::Gcp, CommandRequest::new(command, project_id))
            .await
    }

    /// Run an `az` sub-command, optionally pinned to a subscription.
    pub async fn execute_azure(
        &self,
        command: &str,
        subscription_id: Option<&str>,
    ) -> crate::Result<ExecutionResult> {
        self.execute(Provider::Azure, CommandRequest::new(command, subscription_id))
            .await
    }

    /// Validate, build and run a caller-supplied command.
    ///
    /// Returns `GatewayError::Validation` when the validator refuses the
    /// command; in that case nothing is spawned.
    pub async fn execute(
        &self,
        provider: Provider,
        request: CommandRequest,
    ) -> crate::Result<ExecutionResult> {
        validator::check(provider, &request.raw_command).map_err(|rejection| {
            tracing::warn!(
                provider = %provider,
                reason = %rejection,
                "command rejected by validator"
            );
            GatewayError::Validation(rejection.to_string())
        })?;

        let invocation = self.build_invocation(provider, &request);

        let cmd = match self.policy.mode {
            ExecutionMode::Shell => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(&invocation);
                cmd
            }
            ExecutionMode::Argv => {
                let Some(mut args) = shlex::split(&request.raw_command) else {
                    return Ok(ExecutionResult::failure(
                        String::new(),
                        String::new(),
                        None,
                        "malformed command: unbalanced quotes or trailing escape".to_string(),
                    ));
                };
                if let Some(scope_id) = &request.scope_id {
                    args.extend(provider.scope_args(scope_id));
                }
                let mut cmd = Command::new(self.program(provider));
                cmd.args(&args);
                cmd
            }
        };

        Ok(self.run_bounded(provider, cmd, &invocation).await)
    }

    /// Run pre-split arguments against the provider CLI without consulting
    /// the validator.
    ///
    /// Reserved for gateway-internal plumbing (access tokens, storage calls)
    /// whose arguments are never caller text. Bounds still apply.
    pub async fn run_internal(&self, provider: Provider, args: &[String]) -> ExecutionResult {
        let mut cmd = Command::new(self.program(provider));
        cmd.args(args);
        let label = format!("{} {}", self.program(provider), args.join(" "));
        self.run_bounded(provider, cmd, &label).await
    }

    /// Spawn `cmd`, drain its output under the size cap, and wait for it under
    /// the timeout. The child runs in its own process group, and the whole
    /// group is killed on every failure path.
    async fn run_bounded(&self, provider: Provider, mut cmd: Command, label: &str) -> ExecutionResult {
        let start = Instant::now();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "failed to spawn CLI process");
                return ExecutionResult::failure(
                    String::new(),
                    String::new(),
                    None,
                    format!("failed to spawn '{}': {}", self.program(provider), e),
                );
            }
        };
        let pgid = child.id();

        let (Some(stdout_pipe), Some(stderr_pipe)) = (child.stdout.take(), child.stderr.take())
        else {
            terminate(&mut child, pgid).await;
            return ExecutionResult::failure(
                String::new(),
                String::new(),
                None,
                "process output pipes unavailable".to_string(),
            );
        };

        let limit = self.policy.max_output_bytes;
        let mut out = Vec::new();
        let mut err = Vec::new();

        let mut stragglers = false;

        let waited = tokio::time::timeout(self.policy.timeout, async {
            let drain = drain_bounded(stdout_pipe, stderr_pipe, &mut out, &mut err, limit);
            tokio::pin!(drain);

            tokio::select! {
                drained = &mut drain => {
                    if drained? == Drain::Overflow {
                        return Ok(Finished::Overflow);
                    }
                    let status = child.wait().await?;
                    Ok::<Finished, std::io::Error>(Finished::Exited(status))
                }
                status = child.wait() => {
                    let status = status?;
                    match tokio::time::timeout(EXIT_GRACE, &mut drain).await {
                        Ok(Ok(Drain::Overflow)) => Ok(Finished::Overflow),
                        Ok(Ok(Drain::Complete)) => Ok(Finished::Exited(status)),
                        Ok(Err(e)) => Err(e),
                        Err(_) => {
                            stragglers = true;
                            Ok(Finished::Exited(status))
                        }
                    }
                }
            }
        })
        .await;

        if stragglers {
            tracing::debug!(provider = %provider, "descendants held output open after exit");
            terminate(&mut child, pgid).await;
        }

        let stdout = String::from_utf8_lossy(&out).into_owned();
        let stderr = String::from_utf8_lossy(&err).into_owned();
        let elapsed = start.elapsed().as_millis();

        let result = match waited {
            Ok(Ok(Finished::Exited(status))) if status.success() => ExecutionResult {
                stdout,
                stderr,
                exit_code: 0,
            },
            Ok(Ok(Finished::Exited(status))) => ExecutionResult::failure(
                stdout,
                stderr,
                status.code(),
                format!("command exited with {}", status),
            ),
            Ok(Ok(Finished::Overflow)) => {
                terminate(&mut child, pgid).await;
                tracing::warn!(provider = %provider, limit = %limit, "CLI output exceeded cap");
                ExecutionResult::aborted(
                    stdout,
                    stderr,
                    format!("command output exceeded {} bytes", limit),
                )
            }
            Ok(Err(e)) => {
                terminate(&mut child, pgid).await;
                ExecutionResult::aborted(stdout, stderr, format!("process I/O error: {}", e))
            }
            Err(_elapsed) => {
                // Kill the processes, not just the future.
                terminate(&mut child, pgid).await;
                tracing::warn!(
                    provider = %provider,
                    timeout_secs = %self.policy.timeout.as_secs_f64(),
                    "CLI invocation timed out"
                );
                ExecutionResult::aborted(
                    stdout,
                    stderr,
                    format!(
                        "command timed out after {:.1}s",
                        self.policy.timeout.as_secs_f64()
                    ),
                )
            }
        };

        tracing::info!(
            provider = %provider,
            invocation = %label,
            exit_code = %result.exit_code,
            duration_ms = %elapsed,
            "CLI invocation"
        );
        if !result.stderr.is_empty() {
            tracing::debug!(provider = %provider, stderr = %result.stderr, "CLI stderr");
        }

        result
    }
}
