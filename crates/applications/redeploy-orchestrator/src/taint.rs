//! Best-effort taint of resources before redeploy
//!
//! A resource that is already tainted or already destroyed makes terraform
//! taint fail. That is the expected state on a repeated redeploy, and the
//! following apply converges either way, so failures never leave this module.

use crate::infra::InfraEngine;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of a taint request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintResult {
    /// Addresses the engine was asked to taint
    pub requested: Vec<String>,
    /// Engine failure, if any (advisory only)
    pub error: Option<String>,
}

impl TaintResult {
    /// Whether the engine reported success
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Asks the infrastructure engine to force recreation of resources
pub struct TaintRequester<'a> {
    engine: &'a dyn InfraEngine,
}

impl<'a> TaintRequester<'a> {
    /// Create a requester over an engine
    pub fn new(engine: &'a dyn InfraEngine) -> Self {
        Self { engine }
    }

    /// Request taint of every resource; never fails
    pub async fn taint(&self, resources: &[Resource]) -> TaintResult {
        let requested: Vec<String> = resources.iter().map(Resource::address).collect();

        if requested.is_empty() {
            return TaintResult {
                requested,
                error: None,
            };
        }

        info!(count = requested.len(), "Requesting taint of redeploy resources");

        let error = match self.engine.taint(&requested).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Taint failed, resources may already be tainted or destroyed");
                Some(e.to_string())
            }
        };

        TaintResult { requested, error }
    }
}
