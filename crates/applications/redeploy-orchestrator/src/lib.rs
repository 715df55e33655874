//! # Redeploy Orchestrator
//!
//! Redeploys an already-installed platform whose infrastructure is applied by
//! Terraform and whose services run on ECS.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator
//! ├── Completeness check     marker file in the terraform dir
//! ├── Resource selection     deploy subset / complete set
//! ├── Taint                  best effort
//! └── Run
//!     ├── Apply  ──── liveness ────┐
//!     └── Drain  ←─────────────────┘  deregister task defs, stop tasks
//! ```
//!
//! Apply and drain run as separate tasks. The only thing drain learns about
//! apply is whether it is still running; drain stops as soon as it is not.
//!
//! See [`orchestrator`] and [`drain`] modules for details.

#![warn(clippy::all)]

pub mod apply;
pub mod config;
pub mod context;
pub mod drain;
pub mod error;
pub mod infra;
pub mod liveness;
pub mod orchestrator;
pub mod platform;
pub mod provider;
pub mod resource;
pub mod selector;
pub mod state;
pub mod taint;

// ============================================================================
// Public exports - Orchestration
// ============================================================================

pub use orchestrator::{RedeployOrchestrator, RedeployPhase, RedeployReport};

// Activities
pub use apply::ApplyRunner;
pub use drain::{DrainCoordinator, DrainExit, DrainReport};
pub use taint::{TaintRequester, TaintResult};

// Selection and state
pub use resource::{Capability, Resource, ResourceCatalog};
pub use selector::ResourceSelector;
pub use state::InstallationState;

// ============================================================================
// Public exports - Core infrastructure
// ============================================================================

// Error handling
pub use error::{RedeployError, Result};

// Configuration and inputs
pub use config::{DrainConfig, MarkerSpec, RedeployConfig};
pub use context::{Credentials, RedeployInputs, RunContext};

// External collaborators
pub use infra::{ApplyScope, InfraEngine, TerraformRunner};
pub use liveness::{apply_liveness, ApplyLiveness, ApplySignal};
pub use platform::{create_ecs_client, EcsPlatform, RuntimePlatform};
pub use provider::{AwsPrerequisites, PrerequisiteCheck, Provider};
