//! Terraform infrastructure engine.
//!
//! Wraps the terraform CLI behind the [`InfraEngine`] trait so the
//! orchestrator can taint and apply without caring how the engine runs.
//! Commands run through `tokio::process` so a long apply never blocks the
//! drain task sharing the runtime.

use crate::context::RedeployInputs;
use crate::error::{RedeployError, Result};
use crate::resource::Resource;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How far an apply reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyScope {
    /// Only the given resources, via `-target`
    Targeted,
    /// The whole configuration
    All,
}

impl ApplyScope {
    /// Scope for a `use_targets` flag
    pub fn from_use_targets(use_targets: bool) -> Self {
        if use_targets { Self::Targeted } else { Self::All }
    }
}

/// Infrastructure-as-code engine operations used by a redeploy
#[async_trait]
pub trait InfraEngine: Send + Sync {
    /// Mark resources for forced recreation on the next apply
    async fn taint(&self, addresses: &[String]) -> Result<()>;

    /// Apply (or plan, when `dry_run`) the given resources
    async fn apply(
        &self,
        inputs: &RedeployInputs,
        resources: &[Resource],
        scope: ApplyScope,
        dry_run: bool,
    ) -> Result<()>;
}

/// Terraform runner that wraps terraform CLI commands.
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    /// Directory containing the Terraform configuration and state
    pub terraform_dir: PathBuf,
    /// Terraform executable
    pub terraform_bin: String,
}

impl TerraformRunner {
    /// Create a new Terraform runner.
    pub fn new(terraform_dir: impl Into<PathBuf>, terraform_bin: impl Into<String>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            terraform_bin: terraform_bin.into(),
        }
    }

    /// Initialize Terraform (terraform init).
    pub async fn init(&self) -> Result<()> {
        info!("Running terraform init in {}", self.terraform_dir.display());
        self.run("init", &["init".to_string(), "-input=false".to_string()])
            .await
            .map(|_| ())
    }

    /// Arguments for `terraform apply` / `terraform plan`
    pub fn apply_args(
        inputs: &RedeployInputs,
        resources: &[Resource],
        scope: ApplyScope,
        dry_run: bool,
    ) -> Vec<String> {
        let mut args = if dry_run {
            vec!["plan".to_string(), "-input=false".to_string()]
        } else {
            vec![
                "apply".to_string(),
                "-auto-approve".to_string(),
                "-input=false".to_string(),
            ]
        };

        for (key, value) in &inputs.values {
            args.push(format!("-var={}={}", key, value));
        }

        if scope == ApplyScope::Targeted {
            args.extend(resources.iter().map(|r| format!("-target={}", r.address())));
        }

        args
    }

    async fn run(&self, command: &str, args: &[String]) -> Result<String> {
        debug!(command, ?args, "Invoking terraform");

        let output = Command::new(&self.terraform_bin)
            .args(args)
            .current_dir(&self.terraform_dir)
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RedeployError::terraform(command, stderr.trim()))
        }
    }
}

#[async_trait]
impl InfraEngine for TerraformRunner {
    /// Taints each address in turn; every address is attempted even after a
    /// failure, and the first failure is returned.
    async fn taint(&self, addresses: &[String]) -> Result<()> {
        let mut first_error = None;

        for address in addresses {
            let args = ["taint".to_string(), address.clone()];
            match self.run("taint", &args).await {
                Ok(_) => debug!(address = %address, "Tainted resource"),
                Err(e) => {
                    warn!(address = %address, error = %e, "terraform taint failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn apply(
        &self,
        inputs: &RedeployInputs,
        resources: &[Resource],
        scope: ApplyScope,
        dry_run: bool,
    ) -> Result<()> {
        // terraform treats "no -target flags" as "everything"
        if scope == ApplyScope::Targeted && resources.is_empty() {
            info!("No resources to apply, skipping terraform");
            return Ok(());
        }

        self.init().await?;

        let args = Self::apply_args(inputs, resources, scope, dry_run);
        let command = if dry_run { "plan" } else { "apply" };

        info!(
            command,
            scope = ?scope,
            resources = resources.len(),
            "Running terraform {} in {}",
            command,
            self.terraform_dir.display()
        );

        let stdout = self.run(command, &args).await?;
        debug!(output = %stdout.trim(), "terraform {} finished", command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resources() -> Vec<Resource> {
        vec![
            Resource::ecs_cluster("prod", "prod"),
            Resource::ecs_task_definition("web", "web-fam"),
        ]
    }

    #[test]
    fn test_targeted_apply_args() {
        let inputs = RedeployInputs::new("us-east-1").with_value("region", "us-east-1");
        let args = TerraformRunner::apply_args(&inputs, &resources(), ApplyScope::Targeted, false);

        assert_eq!(
            args,
            vec![
                "apply",
                "-auto-approve",
                "-input=false",
                "-var=region=us-east-1",
                "-target=aws_ecs_cluster.prod",
                "-target=aws_ecs_task_definition.web",
            ]
        );
    }

    #[test]
    fn test_full_apply_has_no_targets() {
        let inputs = RedeployInputs::new("us-east-1");
        let args = TerraformRunner::apply_args(&inputs, &resources(), ApplyScope::All, false);
        assert!(args.iter().all(|a| !a.starts_with("-target=")));
    }

    #[test]
    fn test_dry_run_plans() {
        let inputs = RedeployInputs::new("us-east-1");
        let args = TerraformRunner::apply_args(&inputs, &resources(), ApplyScope::Targeted, true);
        assert_eq!(args[0], "plan");
        assert!(!args.contains(&"-auto-approve".to_string()));
    }

    #[test]
    fn test_scope_from_use_targets() {
        assert_eq!(ApplyScope::from_use_targets(true), ApplyScope::Targeted);
        assert_eq!(ApplyScope::from_use_targets(false), ApplyScope::All);
    }

    #[tokio::test]
    async fn test_empty_targeted_apply_is_skipped() {
        let runner = TerraformRunner::new("/nonexistent", "terraform-does-not-exist-on-path");
        let result = runner
            .apply(&RedeployInputs::new("us-east-1"), &[], ApplyScope::Targeted, false)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TerraformRunner::new(dir.path(), "terraform-does-not-exist-on-path");
        let result = runner.taint(&["aws_ecs_cluster.prod".to_string()]).await;
        assert!(matches!(result, Err(RedeployError::Io(_))));
    }

    /// Stand-in terraform that logs each invocation's arguments to `calls.log`
    /// and then runs `body`
    #[cfg(unix)]
    fn fake_terraform(dir: &std::path::Path, body: &str) -> TerraformRunner {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("terraform");
        let log = dir.join("calls.log");
        let script = format!("#!/bin/sh\necho \"$*\" >> '{}'\n{}\nexit 0\n", log.display(), body);
        std::fs::write(&bin, script).unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        TerraformRunner::new(dir, bin.to_string_lossy().to_string())
    }

    #[cfg(unix)]
    fn calls(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_taint_continues_after_failed_address() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake_terraform(
            dir.path(),
            r#"if [ "$2" = "aws_ecs_cluster.prod" ]; then echo "already tainted" >&2; exit 1; fi"#,
        );

        let addresses = vec![
            "aws_ecs_cluster.prod".to_string(),
            "aws_ecs_task_definition.web".to_string(),
        ];
        let result = runner.taint(&addresses).await;

        assert_eq!(
            calls(dir.path()),
            vec![
                "taint aws_ecs_cluster.prod",
                "taint aws_ecs_task_definition.web",
            ]
        );
        assert!(matches!(
            result,
            Err(RedeployError::Terraform { ref command, ref stderr })
                if command == "taint" && stderr == "already tainted"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_runs_init_first() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake_terraform(dir.path(), "");

        let result = runner
            .apply(&RedeployInputs::new("us-east-1"), &resources(), ApplyScope::Targeted, false)
            .await;

        assert!(result.is_ok());
        assert_eq!(
            calls(dir.path()),
            vec![
                "init -input=false",
                "apply -auto-approve -input=false \
                 -target=aws_ecs_cluster.prod -target=aws_ecs_task_definition.web",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dry_run_runs_init_then_plan() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake_terraform(dir.path(), "");

        runner
            .apply(&RedeployInputs::new("us-east-1"), &resources(), ApplyScope::All, true)
            .await
            .unwrap();

        assert_eq!(calls(dir.path()), vec!["init -input=false", "plan -input=false"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_apply_reports_apply_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake_terraform(
            dir.path(),
            r#"if [ "$1" = "apply" ]; then echo "Error: creating ECS Service" >&2; exit 1; fi"#,
        );

        let result = runner
            .apply(&RedeployInputs::new("us-east-1"), &resources(), ApplyScope::All, false)
            .await;

        assert_eq!(calls(dir.path()).len(), 2);
        assert!(matches!(
            result,
            Err(RedeployError::Terraform { ref command, ref stderr })
                if command == "apply" && stderr == "Error: creating ECS Service"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_init_skips_apply() {
        let dir = tempfile::tempdir().unwrap();
        let runner = fake_terraform(
            dir.path(),
            r#"if [ "$1" = "init" ]; then echo "backend unreachable" >&2; exit 1; fi"#,
        );

        let result = runner
            .apply(&RedeployInputs::new("us-east-1"), &resources(), ApplyScope::All, false)
            .await;

        assert_eq!(calls(dir.path()), vec!["init -input=false"]);
        assert!(matches!(
            result,
            Err(RedeployError::Terraform { ref command, .. }) if command == "init"
        ));
    }
}
