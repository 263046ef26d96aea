//! Thin JSON client over the `aws` command line

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::AwsError;
use crate::runner::{CommandRunner, LocalRunner};

/// Provider settings, read from the `[aws]` config table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Regions scanned by the regional kinds
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Named profile passed to the CLI
    #[serde(default)]
    pub profile: Option<String>,

    /// Timeout of a single CLI call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Binary to call
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_regions() -> Vec<String> {
    vec!["us-east-1".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_program() -> String {
    "aws".to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            profile: None,
            timeout_secs: default_timeout_secs(),
            program: default_program(),
        }
    }
}

/// Calls `aws <service> <operation> ... --output json`
pub struct AwsCli {
    runner: Arc<dyn CommandRunner>,
    program: String,
    profile: Option<String>,
    timeout: Duration,
}

impl AwsCli {
    /// Create a client backed by the given runner
    pub fn new(runner: Arc<dyn CommandRunner>, config: &AwsConfig) -> Self {
        Self {
            runner,
            program: config.program.clone(),
            profile: config.profile.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Create a client running the local `aws` binary
    #[must_use]
    pub fn local(config: &AwsConfig) -> Self {
        Self::new(Arc::new(LocalRunner::new()), config)
    }

    /// Build the full argument list of a call
    #[must_use]
    pub fn arguments(&self, args: &[&str], region: Option<&str>) -> Vec<String> {
        let mut argv: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        argv.extend(["--output".to_string(), "json".to_string()]);
        if let Some(region) = region {
            argv.extend(["--region".to_string(), region.to_string()]);
        }
        if let Some(profile) = &self.profile {
            argv.extend(["--profile".to_string(), profile.clone()]);
        }
        argv
    }

    /// Run a call and parse its JSON answer
    ///
    /// # Errors
    /// Returns `CommandFailed` on a failure exit status, `ParseError` if the
    /// output is empty or not JSON, and the runner errors otherwise.
    #[instrument(skip(self), level = "debug")]
    pub async fn call(&self, args: &[&str], region: Option<&str>) -> Result<Value, AwsError> {
        let argv = self.arguments(args, region);
        let result = self
            .runner
            .run_with_timeout(&self.program, &argv, self.timeout)
            .await?;

        if !result.success() {
            return Err(AwsError::CommandFailed {
                status: result.status,
                stderr: result.stderr.trim().to_string(),
            });
        }

        debug!(duration = ?result.duration, bytes = result.stdout.len(), "aws call completed");

        if result.stdout.trim().is_empty() {
            return Err(AwsError::ParseError(format!("{}: empty response", args.join(" "))));
        }
        serde_json::from_str(&result.stdout)
            .map_err(|e| AwsError::ParseError(format!("{}: {e}", args.join(" "))))
    }
}

impl std::fmt::Debug for AwsCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCli")
            .field("runner", &self.runner.runner_type())
            .field("program", &self.program)
            .field("profile", &self.profile)
            .field("timeout", &self.timeout)
            .finish()
    }
}
