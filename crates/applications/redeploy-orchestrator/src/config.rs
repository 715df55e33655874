//! Redeploy configuration
//!
//! Defaults mirror the installer's conventions: the `deploy` category is
//! always redeployed, and a Redshift cluster definition in the Terraform
//! directory means a prior full install must be re-applied as a whole.

use std::path::PathBuf;
use std::time::Duration;

/// Category whose resources are always tainted on redeploy
pub const DEFAULT_TAINT_CATEGORY: &str = "deploy";

/// Maximum number of stop-all-tasks attempts while apply is running
pub const DEFAULT_MAX_STOP_ATTEMPTS: u32 = 3;

/// Wait between stop-all-tasks attempts (seconds)
pub const DEFAULT_STOP_INTERVAL_SECS: u64 = 20;

/// Marker file naming convention: `<category>_<provider>_<ResourceKind>.tf`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec {
    /// Resource category (e.g. "datastore")
    pub category: String,
    /// Provider service prefix (e.g. "redshift")
    pub provider: String,
    /// Resource kind (e.g. "RedshiftCluster")
    pub kind: String,
}

impl MarkerSpec {
    /// Create a marker spec
    pub fn new(
        category: impl Into<String>,
        provider: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            provider: provider.into(),
            kind: kind.into(),
        }
    }

    /// File name of the marker in the Terraform directory
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.tf", self.category, self.provider, self.kind)
    }
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self::new("datastore", "redshift", "RedshiftCluster")
    }
}

/// Drain loop tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainConfig {
    /// Upper bound on stop-all-tasks calls
    pub max_stop_attempts: u32,

    /// Fixed wait between attempts
    pub stop_interval: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            max_stop_attempts: DEFAULT_MAX_STOP_ATTEMPTS,
            stop_interval: Duration::from_secs(DEFAULT_STOP_INTERVAL_SECS),
        }
    }
}

/// Configuration for a redeploy run
#[derive(Debug, Clone)]
pub struct RedeployConfig {
    /// Directory holding the generated Terraform files and state
    pub terraform_dir: PathBuf,

    /// Terraform executable (name on PATH or absolute path)
    pub terraform_bin: String,

    /// Category selected for forced recreation
    pub taint_category: String,

    /// Marker whose presence requires a complete install
    pub completeness_marker: MarkerSpec,

    /// Drain loop tuning
    pub drain: DrainConfig,
}

impl Default for RedeployConfig {
    fn default() -> Self {
        Self {
            terraform_dir: PathBuf::from("./terraform"),
            terraform_bin: "terraform".to_string(),
            taint_category: DEFAULT_TAINT_CATEGORY.to_string(),
            completeness_marker: MarkerSpec::default(),
            drain: DrainConfig::default(),
        }
    }
}

impl RedeployConfig {
    /// Set the Terraform directory
    pub fn with_terraform_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.terraform_dir = dir.into();
        self
    }

    /// Set the Terraform executable
    pub fn with_terraform_bin(mut self, bin: impl Into<String>) -> Self {
        self.terraform_bin = bin.into();
        self
    }

    /// Set the taint category
    pub fn with_taint_category(mut self, category: impl Into<String>) -> Self {
        self.taint_category = category.into();
        self
    }

    /// Set the completeness marker
    pub fn with_marker(mut self, marker: MarkerSpec) -> Self {
        self.completeness_marker = marker;
        self
    }

    /// Set drain tuning
    pub fn with_drain(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }
}
