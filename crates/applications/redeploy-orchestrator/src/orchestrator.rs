//! Redeploy orchestration
//!
//! Sequences one redeploy run:
//!
//! ```text
//! Init (prerequisites)
//!     │
//!     ├── DetermineCompleteness   marker check, once
//!     │
//!     ├── SelectResources         taint subset + apply set snapshot
//!     │
//!     ├── Taint                   best effort, completes first
//!     │
//!     ├── Run ─┬─ apply           terraform apply / plan
//!     │        └─ drain           deregister + stop tasks while apply lives
//!     │
//!     └── Join → Done
//! ```
//!
//! Only a prerequisite failure or an apply failure fails the run.

use crate::apply::ApplyRunner;
use crate::config::RedeployConfig;
use crate::context::{RedeployInputs, RunContext};
use crate::drain::{DrainCoordinator, DrainReport};
use crate::error::{RedeployError, Result};
use crate::infra::{InfraEngine, TerraformRunner};
use crate::liveness::apply_liveness;
use crate::platform::RuntimePlatform;
use crate::provider::{PrerequisiteCheck, Provider};
use crate::resource::{Resource, ResourceCatalog};
use crate::selector::ResourceSelector;
use crate::state::InstallationState;
use crate::taint::{TaintRequester, TaintResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Phases of a redeploy run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedeployPhase {
    /// Prerequisite checks
    Init,
    /// Installation completeness check
    DetermineCompleteness,
    /// Resource subset selection
    SelectResources,
    /// Best-effort taint
    Taint,
    /// Apply and drain running concurrently
    Run,
    /// Waiting for both activities
    Join,
    /// Run finished successfully
    Done,
}

/// Summary of a successful redeploy run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeployReport {
    /// Run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When both activities had finished
    pub finished_at: DateTime<Utc>,
    /// Plan-only run
    pub dry_run: bool,
    /// Whether the complete resource set was applied
    pub need_complete_install: bool,
    /// Whether apply was scoped with targets
    pub use_targets: bool,
    /// Addresses selected for taint
    pub tainted: Vec<String>,
    /// Addresses handed to apply and drain
    pub applied: Vec<String>,
    /// Taint outcome (advisory)
    pub taint: TaintResult,
    /// Drain outcome; `None` if the drain task panicked
    pub drain: Option<DrainReport>,
    /// Phases entered, in order
    pub phases: Vec<RedeployPhase>,
}

/// Top-level redeploy sequencer
pub struct RedeployOrchestrator {
    config: RedeployConfig,
    engine: Arc<dyn InfraEngine>,
    platform: Arc<dyn RuntimePlatform>,
    prerequisites: Box<dyn PrerequisiteCheck>,
    selector: ResourceSelector,
}

impl RedeployOrchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        config: RedeployConfig,
        engine: Arc<dyn InfraEngine>,
        platform: Arc<dyn RuntimePlatform>,
        prerequisites: Box<dyn PrerequisiteCheck>,
    ) -> Self {
        let selector = ResourceSelector::new(config.taint_category.clone());
        Self {
            config,
            engine,
            platform,
            prerequisites,
            selector,
        }
    }

    /// Wire the provider's collaborators with a terraform engine
    pub async fn for_provider(
        provider: Provider,
        config: RedeployConfig,
        inputs: &RedeployInputs,
    ) -> Self {
        let engine = Arc::new(TerraformRunner::new(
            config.terraform_dir.clone(),
            config.terraform_bin.clone(),
        ));
        let platform = provider.runtime_platform(inputs).await;
        Self::new(config, engine, platform, provider.prerequisites())
    }

    /// Get the current configuration
    pub fn config(&self) -> &RedeployConfig {
        &self.config
    }

    /// Run a complete redeploy
    pub async fn run(
        &self,
        catalog: &ResourceCatalog,
        inputs: RedeployInputs,
        dry_run: bool,
    ) -> Result<RedeployReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut phases = Vec::new();

        info!(%run_id, dry_run, resources = catalog.len(), "Starting redeploy");

        enter(&mut phases, RedeployPhase::Init);
        if let Err(e) = self.prerequisites.check(&self.config, &inputs) {
            error!(%run_id, error = %e, "Prerequisite check failed");
            return Err(e);
        }

        enter(&mut phases, RedeployPhase::DetermineCompleteness);
        let state =
            InstallationState::detect(&self.config.terraform_dir, &self.config.completeness_marker);

        enter(&mut phases, RedeployPhase::SelectResources);
        let tainted = self.selector.select_for_taint(catalog, &inputs);
        let to_process = if state.need_complete_install {
            self.selector.select_complete(catalog, &inputs)
        } else {
            tainted.clone()
        };

        enter(&mut phases, RedeployPhase::Taint);
        let taint = TaintRequester::new(self.engine.as_ref()).taint(&tainted).await;

        let ctx = RunContext {
            run_id,
            started_at,
            inputs,
            dry_run,
            need_complete_install: state.need_complete_install,
            tainted,
            to_process,
        }
        .shared();

        enter(&mut phases, RedeployPhase::Run);
        let drain = self.run_concurrently(&ctx, &mut phases).await?;
        enter(&mut phases, RedeployPhase::Done);

        let report = RedeployReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            dry_run,
            need_complete_install: ctx.need_complete_install,
            use_targets: ctx.use_targets(),
            tainted: ctx.tainted.iter().map(Resource::address).collect(),
            applied: ctx.to_process.iter().map(Resource::address).collect(),
            taint,
            drain,
            phases,
        };

        info!(
            %run_id,
            applied = report.applied.len(),
            drain_exit = ?report.drain.as_ref().map(|d| d.exit),
            "Redeploy completed"
        );

        Ok(report)
    }

    /// Spawn apply and drain, then wait for both
    async fn run_concurrently(
        &self,
        ctx: &Arc<RunContext>,
        phases: &mut Vec<RedeployPhase>,
    ) -> Result<Option<DrainReport>> {
        let (signal, liveness) = apply_liveness();

        let apply_task = {
            let runner = ApplyRunner::new(self.engine.clone());
            let ctx = ctx.clone();
            tokio::spawn(async move {
                runner
                    .apply(&ctx.inputs, &ctx.to_process, ctx.use_targets(), ctx.dry_run, signal)
                    .await
            })
        };

        let drain_task = {
            let coordinator =
                DrainCoordinator::new(self.platform.clone(), self.config.drain.clone());
            let ctx = ctx.clone();
            tokio::spawn(async move {
                coordinator
                    .drain(&ctx.to_process, ctx.dry_run, liveness)
                    .await
            })
        };

        enter(phases, RedeployPhase::Join);
        let (applied, drained) = tokio::join!(apply_task, drain_task);

        let drain = match drained {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Drain task aborted");
                None
            }
        };

        match applied {
            Ok(result) => result?,
            Err(e) => return Err(RedeployError::TaskJoin(e.to_string())),
        }

        Ok(drain)
    }
}

fn enter(phases: &mut Vec<RedeployPhase>, phase: RedeployPhase) {
    debug!(?phase, "Entering redeploy phase");
    phases.push(phase);
}
