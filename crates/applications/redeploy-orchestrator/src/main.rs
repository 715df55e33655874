//! Redeploy - re-apply an installed platform while draining its services
//!
//! ## Usage
//!
//! ```bash
//! # Redeploy the deploy-category resources
//! redeploy --terraform-dir ./terraform --catalog resources.json
//!
//! # Plan only; no tasks are stopped
//! redeploy --terraform-dir ./terraform --catalog resources.json --dry-run
//!
//! # Write a JSON report of what happened
//! redeploy --catalog resources.json --report redeploy-report.json
//! ```

use anyhow::Context;
use clap::Parser;
use redeploy_orchestrator::{
    Credentials, DrainConfig, Provider, RedeployConfig, RedeployInputs, RedeployOrchestrator,
    ResourceCatalog,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Redeploy an installed platform: taint, apply and drain running services
#[derive(Parser)]
#[command(name = "redeploy")]
#[command(
    about = "Redeploy an installed platform with concurrent service draining",
    long_about = None
)]
struct Cli {
    /// Cloud provider (aws)
    #[arg(long, default_value = "aws")]
    provider: String,

    /// Directory with the generated Terraform files and state
    #[arg(long, default_value = "./terraform")]
    terraform_dir: PathBuf,

    /// Terraform executable
    #[arg(long, default_value = "terraform")]
    terraform_bin: String,

    /// Resource catalog (JSON)
    #[arg(long)]
    catalog: PathBuf,

    /// Extra resolved input values passed to Terraform (JSON object)
    #[arg(long)]
    inputs: Option<PathBuf>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// AWS access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID", default_value = "", hide_env_values = true)]
    access_key: String,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", default_value = "", hide_env_values = true)]
    secret_key: String,

    /// Category of resources to taint and redeploy
    #[arg(long, default_value = "deploy")]
    category: String,

    /// Plan only; never stop or deregister anything
    #[arg(long)]
    dry_run: bool,

    /// Stop-all-tasks attempts while apply runs
    #[arg(long, default_value_t = 3)]
    stop_attempts: u32,

    /// Seconds between stop-all-tasks attempts
    #[arg(long, default_value_t = 20)]
    stop_interval: u64,

    /// Write the run report to this file (JSON)
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redeploy=info,redeploy_orchestrator=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let provider: Provider = cli.provider.parse()?;

    let catalog = ResourceCatalog::from_json_file(&cli.catalog)
        .with_context(|| format!("failed to load catalog {}", cli.catalog.display()))?;

    let values: BTreeMap<String, String> = match &cli.inputs {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read inputs {}", path.display()))?;
            serde_json::from_str(&raw).context("inputs must be a JSON object of strings")?
        }
        None => BTreeMap::new(),
    };

    let inputs = RedeployInputs {
        region: cli.region,
        credentials: Credentials::new(cli.access_key, cli.secret_key),
        values,
    };

    let config = RedeployConfig::default()
        .with_terraform_dir(cli.terraform_dir)
        .with_terraform_bin(cli.terraform_bin)
        .with_taint_category(cli.category)
        .with_drain(DrainConfig {
            max_stop_attempts: cli.stop_attempts,
            stop_interval: Duration::from_secs(cli.stop_interval),
        });

    info!("🚀 Redeploying with provider {} ({} resources)", provider, catalog.len());

    let orchestrator = RedeployOrchestrator::for_provider(provider, config, &inputs).await;

    let report = match orchestrator.run(&catalog, inputs, cli.dry_run).await {
        Ok(report) => report,
        Err(e) => {
            error!("❌ Redeploy failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(path) = cli.report {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    info!(
        "✅ Redeploy complete: {} resources applied ({})",
        report.applied.len(),
        if report.use_targets { "targeted" } else { "complete install" }
    );

    Ok(())
}
