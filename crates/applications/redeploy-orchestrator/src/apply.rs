//! Apply activity of a redeploy run

use crate::context::RedeployInputs;
use crate::error::Result;
use crate::infra::{ApplyScope, InfraEngine};
use crate::liveness::ApplySignal;
use crate::resource::Resource;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs the engine apply and reports liveness while it does
pub struct ApplyRunner {
    engine: Arc<dyn InfraEngine>,
}

impl ApplyRunner {
    /// Create a runner over an engine
    pub fn new(engine: Arc<dyn InfraEngine>) -> Self {
        Self { engine }
    }

    /// Apply `resources`, targeted when `use_targets` is set.
    ///
    /// `signal` is held until the engine returns, so the drain task observes
    /// completion on success, failure and panic alike.
    pub async fn apply(
        &self,
        inputs: &RedeployInputs,
        resources: &[Resource],
        use_targets: bool,
        dry_run: bool,
        signal: ApplySignal,
    ) -> Result<()> {
        let scope = ApplyScope::from_use_targets(use_targets);
        let start = Instant::now();

        info!(
            scope = ?scope,
            resources = resources.len(),
            dry_run,
            "Starting infrastructure apply"
        );

        let result = self.engine.apply(inputs, resources, scope, dry_run).await;
        signal.finish();

        match &result {
            Ok(()) => info!(
                elapsed_secs = start.elapsed().as_secs_f64(),
                "Infrastructure apply completed"
            ),
            Err(e) => error!(error = %e, "Infrastructure apply failed"),
        }

        result
    }
}
