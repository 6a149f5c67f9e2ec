//! External tool execution with timeout handling.
//!
//! Provides the production [`ExternalToolRunner`]:
//! - Both output streams captured in full and decoded lossily as UTF-8
//! - Per-invocation timeout; the child is killed when it expires
//! - Non-zero exit codes are reported, not treated as errors

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use notaryflow_core::notarization::redact_arguments;
use notaryflow_core::ExternalToolRunner;
use notaryflow_domain::{NotaryError, Result, ToolOutput, ToolsConfig};
use tokio::process::Command;

/// Runs tools as child processes on the tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    timeout: Duration,
}

impl TokioProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.timeout())
    }
}

#[async_trait]
impl ExternalToolRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Path>,
    ) -> Result<ToolOutput> {
        tracing::debug!(
            program,
            args = ?redact_arguments(args),
            timeout_secs = self.timeout.as_secs(),
            "Running external tool"
        );

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| NotaryError::tool(program, format!("failed to spawn: {e}")))?;

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(program, error = %e, "Failed to wait for external tool");
                return Err(NotaryError::tool(program, format!("failed to wait: {e}")));
            }
            Err(_) => {
                tracing::warn!(
                    program,
                    timeout_secs = self.timeout.as_secs(),
                    "External tool timed out, killing process"
                );
                return Err(NotaryError::tool(
                    program,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        let result = ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::trace!(
            program,
            exit_code = ?result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "External tool exited"
        );

        Ok(result)
    }
}
