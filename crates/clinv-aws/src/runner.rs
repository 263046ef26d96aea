//! Local command execution using `tokio::process`

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::AwsError;

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs provider commands
///
/// Arguments are passed to the program as is, without a shell in between.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandResult, AwsError>;

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandResult, AwsError>;

    fn runner_type(&self) -> &'static str;
}

/// Local command runner
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// `<service> <operation>` of a CLI call, for logs
    fn operation(args: &[String]) -> String {
        args.iter()
            .take_while(|arg| !arg.starts_with("--"))
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[instrument(skip(self, args), fields(operation = %Self::operation(args)), level = "debug")]
    async fn spawn(&self, program: &str, args: &[String]) -> Result<CommandResult, AwsError> {
        let started = Instant::now();
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    AwsError::SpawnError(format!("{program}: {e}"))
                }
                _ => AwsError::IoError(e.to_string()),
            })?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration: started.elapsed(),
        };

        if result.success() {
            debug!(duration = ?result.duration, "call finished");
        } else {
            warn!(
                status = result.status,
                stderr = %result.stderr.trim(),
                "call exited with failure"
            );
        }
        Ok(result)
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandResult, AwsError> {
        self.spawn(program, args).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandResult, AwsError> {
        timeout(limit, self.spawn(program, args))
            .await
            .unwrap_or_else(|_| {
                warn!(operation = %Self::operation(args), timeout = ?limit, "call timed out");
                Err(AwsError::Timeout { timeout: limit })
            })
    }

    fn runner_type(&self) -> &'static str {
        "local"
    }
}
