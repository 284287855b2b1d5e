//! Enqueue command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use jobpool_common::AutoscalerConfig;
use jobpool_controller::{connect, ConnectionSource, ReconcileOutcome, Reconciler};

use super::load_definition;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Worker definition YAML file
    #[arg(long)]
    pub definition: PathBuf,
}

pub async fn run(
    args: EnqueueArgs,
    config: AutoscalerConfig,
    kubeconfig: Option<PathBuf>,
) -> anyhow::Result<()> {
    let definition = load_definition(&args.definition)?;

    if !config.enabled {
        info!("autoscaling disabled, pass --enabled or set JOBPOOL_ENABLED");
        return Ok(());
    }

    let gateway = connect(ConnectionSource::from_kubeconfig(kubeconfig), &config)
        .await
        .context("failed to connect to kubernetes")?;
    let reconciler = Reconciler::new(config, gateway);

    let report = reconciler
        .reconcile(&definition)
        .await
        .with_context(|| format!("reconcile failed for {}", args.definition.display()))?;

    match &report.outcome {
        ReconcileOutcome::Created { name, namespace } => info!(
            job = %name,
            namespace = %namespace,
            reaped_jobs = report.reaped_jobs,
            reaped_pods = report.reaped_pods,
            setup_created = report.setup_created,
            "worker job created"
        ),
        ReconcileOutcome::AtCapacity { group, active, limit } => info!(
            group = %group,
            active,
            limit,
            reaped_jobs = report.reaped_jobs,
            reaped_pods = report.reaped_pods,
            "worker pool at capacity"
        ),
        ReconcileOutcome::Disabled => info!("autoscaling disabled"),
    }

    Ok(())
}
