//! Error types for clinv-aws

use std::time::Duration;

use clinv_inventory::SourceError;
use thiserror::Error;

/// Errors that can occur while calling the AWS command line
#[derive(Error, Debug, Clone)]
pub enum AwsError {
    /// The `aws` binary could not be started
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error while waiting for the process
    #[error("I/O error: {0}")]
    IoError(String),

    /// The call exited with a failure status
    #[error("command execution failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// The call took longer than the configured timeout
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// The response is not the JSON document we expected
    #[error("unexpected response: {0}")]
    ParseError(String),
}

impl AwsError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AwsError::CommandFailed { .. } | AwsError::Timeout { .. }
        )
    }
}

impl From<AwsError> for SourceError {
    fn from(error: AwsError) -> Self {
        match error {
            AwsError::SpawnError(msg) => SourceError::Unavailable(msg),
            AwsError::Timeout { timeout } => SourceError::Timeout(timeout),
            AwsError::ParseError(msg) => SourceError::Parse(msg),
            other @ (AwsError::IoError(_) | AwsError::CommandFailed { .. }) => {
                SourceError::Command(other.to_string())
            }
        }
    }
}
