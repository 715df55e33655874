//! Best-effort service draining while apply runs
//!
//! While terraform recreates task definitions and services, tasks started
//! from the old definitions keep serving. Draining shortens that window:
//!
//! 1. Deregister every task definition in the run (by `family`)
//! 2. Remember the cluster (by `name`)
//! 3. Stop all running tasks in that cluster, up to `max_stop_attempts`
//!    times, `stop_interval` apart
//!
//! Every step first checks that apply is still running and the loop ends the
//! moment it is not, including in the middle of a wait. Platform errors are
//! logged and dropped: the engine's own replace semantics are authoritative,
//! and draining races the engine on the same resources by nature.

use crate::config::DrainConfig;
use crate::liveness::ApplyLiveness;
use crate::platform::RuntimePlatform;
use crate::resource::{Capability, Resource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a drain pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainExit {
    /// Plan-only run, nothing touched
    DryRun,
    /// Apply finished before or during draining
    ApplyFinished,
    /// No cluster resource in the run, so no tasks to stop
    NoClusterTarget,
    /// Every stop attempt was made while apply kept running
    AttemptsExhausted,
}

/// What a drain pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Families a deregistration was requested for
    pub deregistered_families: Vec<String>,
    /// Cluster whose tasks were targeted
    pub cluster: Option<String>,
    /// Number of stop-all-tasks calls made
    pub stop_attempts: u32,
    /// Platform calls that failed (advisory)
    pub failed_calls: u32,
    /// How the pass ended
    pub exit: DrainExit,
}

impl DrainReport {
    fn new(exit: DrainExit) -> Self {
        Self {
            deregistered_families: Vec::new(),
            cluster: None,
            stop_attempts: 0,
            failed_calls: 0,
            exit,
        }
    }

    /// Total platform calls issued
    pub fn platform_calls(&self) -> u32 {
        self.deregistered_families.len() as u32 + self.stop_attempts
    }
}

/// Drains workload-bearing resources concurrently with apply
pub struct DrainCoordinator {
    platform: Arc<dyn RuntimePlatform>,
    config: DrainConfig,
}

impl DrainCoordinator {
    /// Create a coordinator over a platform
    pub fn new(platform: Arc<dyn RuntimePlatform>, config: DrainConfig) -> Self {
        Self { platform, config }
    }

    /// Run one drain pass. Never fails.
    pub async fn drain(
        &self,
        resources: &[Resource],
        dry_run: bool,
        mut liveness: ApplyLiveness,
    ) -> DrainReport {
        if dry_run {
            debug!("Dry run, skipping drain");
            return DrainReport::new(DrainExit::DryRun);
        }

        let mut report = DrainReport::new(DrainExit::NoClusterTarget);

        for resource in resources {
            if !liveness.is_running() {
                info!(address = %resource.address(), "Apply finished, abandoning drain");
                report.exit = DrainExit::ApplyFinished;
                return report;
            }

            match resource.capability() {
                Capability::TaskDefinition => {
                    let Some(family) = resource.attr_str("family") else {
                        warn!(
                            address = %resource.address(),
                            "Task definition has no family attribute"
                        );
                        continue;
                    };

                    report.deregistered_families.push(family.to_string());
                    if let Err(e) = self.platform.deregister_task_definition(family).await {
                        warn!(family = %family, error = %e, "Deregister failed, continuing");
                        report.failed_calls += 1;
                    }
                }
                Capability::Cluster => match resource.attr_str("name") {
                    Some(name) => report.cluster = Some(name.to_string()),
                    None => warn!(address = %resource.address(), "Cluster has no name attribute"),
                },
                Capability::Generic => {}
            }
        }

        let Some(cluster) = report.cluster.clone() else {
            debug!("No cluster in redeploy set, nothing to stop");
            return report;
        };

        for attempt in 1..=self.config.max_stop_attempts {
            if !liveness.is_running() {
                report.exit = DrainExit::ApplyFinished;
                return report;
            }

            info!(cluster = %cluster, attempt, "Stopping running tasks");
            report.stop_attempts += 1;
            if let Err(e) = self.platform.stop_all_tasks_in_cluster(&cluster).await {
                warn!(cluster = %cluster, attempt, error = %e, "Stop tasks failed, continuing");
                report.failed_calls += 1;
            }

            if attempt == self.config.max_stop_attempts {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.stop_interval) => {}
                _ = liveness.finished() => {
                    debug!(attempt, "Apply finished during stop interval");
                    report.exit = DrainExit::ApplyFinished;
                    return report;
                }
            }
        }

        report.exit = DrainExit::AttemptsExhausted;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RedeployError, Result};
    use crate::liveness::apply_liveness;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Deregister(String),
        Stop(String),
    }

    #[derive(Default)]
    struct RecordingPlatform {
        calls: Mutex<Vec<(Call, Instant)>>,
        fail: bool,
    }

    impl RecordingPlatform {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
        }

        fn record(&self, call: Call) -> Result<()> {
            self.calls.lock().unwrap().push((call, Instant::now()));
            if self.fail {
                Err(RedeployError::from_aws("ClientException: already gone"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RuntimePlatform for RecordingPlatform {
        async fn deregister_task_definition(&self, family: &str) -> Result<()> {
            self.record(Call::Deregister(family.to_string()))
        }

        async fn stop_all_tasks_in_cluster(&self, cluster: &str) -> Result<()> {
            self.record(Call::Stop(cluster.to_string()))
        }
    }

    fn resources() -> Vec<Resource> {
        vec![
            Resource::ecs_cluster("prod", "prod"),
            Resource::ecs_task_definition("web", "web-fam"),
            Resource::new("api", "aws_ecs_service", "deploy"),
        ]
    }

    fn coordinator(platform: &Arc<RecordingPlatform>) -> DrainCoordinator {
        DrainCoordinator::new(platform.clone(), DrainConfig::default())
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let platform = Arc::new(RecordingPlatform::default());
        let (_signal, liveness) = apply_liveness();

        let report = coordinator(&platform).drain(&resources(), true, liveness).await;

        assert_eq!(report.exit, DrainExit::DryRun);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_finished_apply_makes_no_calls() {
        let platform = Arc::new(RecordingPlatform::default());
        let (signal, liveness) = apply_liveness();
        signal.finish();

        let report = coordinator(&platform).drain(&resources(), false, liveness).await;

        assert_eq!(report.exit, DrainExit::ApplyFinished);
        assert_eq!(report.platform_calls(), 0);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_loop_bounded_by_attempts() {
        let platform = Arc::new(RecordingPlatform::default());
        let (_signal, liveness) = apply_liveness();
        let start = Instant::now();

        let report = coordinator(&platform).drain(&resources(), false, liveness).await;

        assert_eq!(report.exit, DrainExit::AttemptsExhausted);
        assert_eq!(report.stop_attempts, 3);
        assert_eq!(
            platform.calls(),
            vec![
                Call::Deregister("web-fam".to_string()),
                Call::Stop("prod".to_string()),
                Call::Stop("prod".to_string()),
                Call::Stop("prod".to_string()),
            ]
        );

        let stops: Vec<Duration> = platform
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| matches!(c, Call::Stop(_)))
            .map(|(_, at)| at.duration_since(start))
            .collect();
        assert_eq!(
            stops,
            vec![Duration::ZERO, Duration::from_secs(20), Duration::from_secs(40)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_loop_ends_mid_wait_when_apply_finishes() {
        let platform = Arc::new(RecordingPlatform::default());
        let (signal, liveness) = apply_liveness();
        let start = Instant::now();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            signal.finish();
        });

        let report = coordinator(&platform).drain(&resources(), false, liveness).await;

        assert_eq!(report.exit, DrainExit::ApplyFinished);
        assert_eq!(report.stop_attempts, 2);
        // woke at the signal, not at the 40s mark
        assert_eq!(start.elapsed(), Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_platform_failures_are_swallowed() {
        let platform = Arc::new(RecordingPlatform {
            fail: true,
            ..Default::default()
        });
        let (_signal, liveness) = apply_liveness();

        let report = coordinator(&platform).drain(&resources(), false, liveness).await;

        assert_eq!(report.exit, DrainExit::AttemptsExhausted);
        assert_eq!(report.failed_calls, 4);
        assert_eq!(platform.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_no_cluster_skips_stop_loop() {
        let platform = Arc::new(RecordingPlatform::default());
        let (_signal, liveness) = apply_liveness();
        let resources = vec![Resource::ecs_task_definition("web", "web-fam")];

        let report = coordinator(&platform).drain(&resources, false, liveness).await;

        assert_eq!(report.exit, DrainExit::NoClusterTarget);
        assert_eq!(report.cluster, None);
        assert_eq!(platform.calls(), vec![Call::Deregister("web-fam".to_string())]);
    }

    #[tokio::test]
    async fn test_cluster_without_name_is_not_a_target() {
        let platform = Arc::new(RecordingPlatform::default());
        let (_signal, liveness) = apply_liveness();
        let resources = vec![Resource::new("prod", "aws_ecs_cluster", "deploy")];

        let report = coordinator(&platform).drain(&resources, false, liveness).await;

        assert_eq!(report.exit, DrainExit::NoClusterTarget);
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn test_drain_report_serialization() {
        let report = DrainReport::new(DrainExit::ApplyFinished);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"exit\":\"ApplyFinished\""));
    }
}
