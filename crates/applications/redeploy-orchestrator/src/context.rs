//! Resolved inputs and the per-run snapshot shared by apply and drain

use crate::resource::Resource;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Static AWS credentials supplied by the user
#[derive(Clone, Default)]
pub struct Credentials {
    /// Access key id
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
}

impl Credentials {
    /// Create credentials from a key pair
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// True when either half of the key pair is missing
    pub fn is_empty(&self) -> bool {
        self.access_key.is_empty() || self.secret_key.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Values collected from the user before the run starts
#[derive(Debug, Clone, Default)]
pub struct RedeployInputs {
    /// AWS region
    pub region: String,

    /// Static credentials; empty means the default provider chain
    pub credentials: Credentials,

    /// Any further resolved input values (passed to Terraform as variables)
    pub values: BTreeMap<String, String>,
}

impl RedeployInputs {
    /// Create inputs for a region
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Set static credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Add an input value
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Immutable snapshot of one redeploy run.
///
/// Built once after selection and shared by reference between the apply and
/// drain tasks; neither side can add or remove resources mid-run.
#[derive(Debug)]
pub struct RunContext {
    /// Correlates log lines and the final report
    pub run_id: Uuid,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Resolved user inputs
    pub inputs: RedeployInputs,

    /// Plan-only run
    pub dry_run: bool,

    /// Whether a prior full install requires applying everything
    pub need_complete_install: bool,

    /// Resources marked for forced recreation
    pub tainted: Vec<Resource>,

    /// Resources handed to apply and drain
    pub to_process: Vec<Resource>,
}

impl RunContext {
    /// Apply is scoped with `-target` exactly when a full reinstall is not required
    pub fn use_targets(&self) -> bool {
        !self.need_complete_install
    }

    /// Freeze the context for sharing across tasks
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
