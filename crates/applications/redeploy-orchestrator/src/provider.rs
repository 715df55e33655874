//! Provider registry
//!
//! Each supported cloud provider contributes its prerequisite check and its
//! runtime platform. The set is closed and resolved at compile time.

use crate::config::RedeployConfig;
use crate::context::RedeployInputs;
use crate::error::{RedeployError, Result};
use crate::platform::{EcsPlatform, RuntimePlatform};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Amazon Web Services (Terraform + ECS)
    Aws,
}

impl FromStr for Provider {
    type Err = RedeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            other => Err(RedeployError::UnknownProvider(other.to_string())),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aws => f.write_str("aws"),
        }
    }
}

impl Provider {
    /// Prerequisite check for this provider
    pub fn prerequisites(&self) -> Box<dyn PrerequisiteCheck> {
        match self {
            Self::Aws => Box::new(AwsPrerequisites),
        }
    }

    /// Runtime platform for this provider
    pub async fn runtime_platform(&self, inputs: &RedeployInputs) -> Arc<dyn RuntimePlatform> {
        match self {
            Self::Aws => Arc::new(EcsPlatform::connect(inputs).await),
        }
    }
}

/// Validation that must pass before anything is mutated
pub trait PrerequisiteCheck: Send + Sync {
    /// Fail with [`RedeployError::Prerequisite`] when the run cannot proceed
    fn check(&self, config: &RedeployConfig, inputs: &RedeployInputs) -> Result<()>;
}

/// Prerequisites for AWS redeploys
pub struct AwsPrerequisites;

impl PrerequisiteCheck for AwsPrerequisites {
    fn check(&self, config: &RedeployConfig, inputs: &RedeployInputs) -> Result<()> {
        if !config.terraform_dir.is_dir() {
            return Err(RedeployError::prerequisite(format!(
                "terraform directory {} does not exist; run install first",
                config.terraform_dir.display()
            )));
        }

        if let Err(e) = which::which(&config.terraform_bin) {
            return Err(RedeployError::prerequisite(format!(
                "terraform executable '{}' not found: {}",
                config.terraform_bin, e
            )));
        }

        if inputs.region.trim().is_empty() {
            return Err(RedeployError::prerequisite("AWS region is not set"));
        }

        if inputs.credentials.is_empty() {
            warn!("No static AWS credentials given, using the default provider chain");
        }

        debug!("AWS prerequisites satisfied");
        Ok(())
    }
}
