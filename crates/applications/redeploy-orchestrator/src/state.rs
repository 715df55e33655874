//! Installation completeness check
//!
//! A prior full install leaves optional component definitions behind in the
//! Terraform directory. When the marker component is present a redeploy must
//! apply the complete resource set instead of just the tainted subset.

use crate::config::MarkerSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Completeness fact, computed once per run before any mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationState {
    /// True when the complete resource set must be applied unscoped
    pub need_complete_install: bool,
}

impl InstallationState {
    /// Check `terraform_dir` for the marker file
    pub fn detect(terraform_dir: &Path, marker: &MarkerSpec) -> Self {
        let marker_path = Self::marker_path(terraform_dir, marker);
        let need_complete_install = marker_path.exists();

        info!(
            marker = %marker_path.display(),
            need_complete_install,
            "Determined installation completeness"
        );

        Self {
            need_complete_install,
        }
    }

    /// Full path of the marker inside `terraform_dir`
    pub fn marker_path(terraform_dir: &Path, marker: &MarkerSpec) -> PathBuf {
        terraform_dir.join(marker.file_name())
    }
}
