//! Error types for the redeploy orchestrator

use thiserror::Error;

/// Orchestrator result type
pub type Result<T> = std::result::Result<T, RedeployError>;

/// Errors that can occur during a redeploy run
#[derive(Error, Debug)]
pub enum RedeployError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Terraform command exited unsuccessfully
    #[error("terraform {command} failed: {stderr}")]
    Terraform {
        /// Subcommand that failed (init, taint, apply, plan)
        command: String,
        /// Captured stderr of the failed invocation
        stderr: String,
    },

    /// Prerequisite check failed before any mutation
    #[error("Prerequisite check failed: {0}")]
    Prerequisite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider identifier with no registered implementation
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Generic AWS service error (ECS, credentials, etc.)
    #[error("AWS service error: {0}")]
    Aws(String),

    /// A concurrent activity panicked or was aborted
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl RedeployError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a prerequisite error
    pub fn prerequisite(msg: impl Into<String>) -> Self {
        Self::Prerequisite(msg.into())
    }

    /// Create a terraform error for a failed subcommand
    pub fn terraform(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Terraform {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Convert from generic AWS SDK error
    pub fn from_aws<E>(err: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Aws(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terraform_error_display() {
        let err = RedeployError::terraform("apply", "Error: cycle detected");
        assert_eq!(err.to_string(), "terraform apply failed: Error: cycle detected");
    }

    #[test]
    fn test_aws_error_display() {
        let err = RedeployError::from_aws("ClusterNotFoundException");
        assert_eq!(err.to_string(), "AWS service error: ClusterNotFoundException");
    }
}
