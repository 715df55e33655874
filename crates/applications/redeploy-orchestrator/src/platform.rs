//! Runtime platform (ECS) operations used while draining
//!
//! Both operations are idempotent from the orchestrator's point of view and
//! are routinely called with identifiers the infrastructure engine is
//! replacing at the same moment. Callers treat every error as advisory.

use crate::context::RedeployInputs;
use crate::error::{RedeployError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecs::types::{DesiredStatus, TaskDefinitionStatus};
use aws_sdk_ecs::Client as EcsClient;
use aws_types::region::Region;
use tracing::{debug, info, warn};

/// Reason recorded on tasks stopped by a redeploy
const STOP_REASON: &str = "Stopped for redeploy";

/// Workload control on the runtime platform
#[async_trait]
pub trait RuntimePlatform: Send + Sync {
    /// Deregister every active revision of a task definition family
    async fn deregister_task_definition(&self, family: &str) -> Result<()>;

    /// Stop every running task in a cluster
    async fn stop_all_tasks_in_cluster(&self, cluster: &str) -> Result<()>;
}

/// Create ECS client from resolved inputs.
///
/// Static credentials are used when both halves are present; otherwise the
/// default AWS provider chain applies.
pub async fn create_ecs_client(inputs: &RedeployInputs) -> EcsClient {
    debug!("Creating ECS client for region: {}", inputs.region);

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(inputs.region.clone()));

    if !inputs.credentials.is_empty() {
        loader = loader.credentials_provider(aws_sdk_ecs::config::Credentials::new(
            inputs.credentials.access_key.clone(),
            inputs.credentials.secret_key.clone(),
            None,
            None,
            "redeploy-inputs",
        ));
    }

    let config = loader.load().await;
    EcsClient::new(&config)
}

/// Family name from a task definition ARN
/// (`arn:aws:ecs:<region>:<account>:task-definition/<family>:<revision>`)
pub fn family_from_arn(arn: &str) -> Option<&str> {
    let (_, tail) = arn.rsplit_once("task-definition/")?;
    let (family, _revision) = tail.rsplit_once(':')?;
    Some(family)
}

/// ECS-backed runtime platform
pub struct EcsPlatform {
    client: EcsClient,
}

impl EcsPlatform {
    /// Create a platform over an existing client
    pub fn new(client: EcsClient) -> Self {
        Self { client }
    }

    /// Create from resolved inputs
    pub async fn connect(inputs: &RedeployInputs) -> Self {
        Self::new(create_ecs_client(inputs).await)
    }

    async fn active_revisions(&self, family: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token = None;

        loop {
            let resp = self
                .client
                .list_task_definitions()
                .family_prefix(family)
                .status(TaskDefinitionStatus::Active)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(RedeployError::from_aws)?;

            // family_prefix also matches longer families ("web" vs "web-worker")
            arns.extend(
                resp.task_definition_arns()
                    .iter()
                    .filter(|arn| family_from_arn(arn) == Some(family))
                    .cloned(),
            );

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(arns)
    }

    async fn running_tasks(&self, cluster: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next_token = None;

        loop {
            let resp = self
                .client
                .list_tasks()
                .cluster(cluster)
                .desired_status(DesiredStatus::Running)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(RedeployError::from_aws)?;

            arns.extend(resp.task_arns().iter().cloned());

            next_token = resp.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(arns)
    }
}

#[async_trait]
impl RuntimePlatform for EcsPlatform {
    async fn deregister_task_definition(&self, family: &str) -> Result<()> {
        let revisions = self.active_revisions(family).await?;
        info!(family = %family, revisions = revisions.len(), "Deregistering task definition");

        let mut first_error = None;
        for arn in revisions {
            if let Err(e) = self
                .client
                .deregister_task_definition()
                .task_definition(&arn)
                .send()
                .await
            {
                warn!(task_definition = %arn, error = %e, "Failed to deregister revision");
                first_error.get_or_insert(RedeployError::from_aws(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stop_all_tasks_in_cluster(&self, cluster: &str) -> Result<()> {
        let tasks = self.running_tasks(cluster).await?;
        info!(cluster = %cluster, tasks = tasks.len(), "Stopping running tasks");

        let mut first_error = None;
        for task in tasks {
            if let Err(e) = self
                .client
                .stop_task()
                .cluster(cluster)
                .task(&task)
                .reason(STOP_REASON)
                .send()
                .await
            {
                warn!(task = %task, error = %e, "Failed to stop task");
                first_error.get_or_insert(RedeployError::from_aws(e));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
