//! jobpool CLI library

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jobpool_common::{AutoscalerConfig, RetryConfig, DEFAULT_MAX_WORKERS};

/// jobpool - autoscale batch workers as Kubernetes Jobs
#[derive(Parser, Debug)]
#[command(name = "jobpool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Turn reconciliation on. Without it `enqueue` does nothing.
    #[arg(long, global = true, env = "JOBPOOL_ENABLED")]
    pub enabled: bool,

    /// Ceiling on active jobs per group when the definition sets none
    #[arg(long, global = true, env = "JOBPOOL_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: u32,

    /// Attempts per remote call before giving up
    #[arg(
        long,
        global = true,
        env = "JOBPOOL_RETRY_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub retry_attempts: u32,

    /// Kubeconfig to use instead of in-cluster or default config.
    /// Without it `KUBECONFIG` and `~/.kube/config` are read as usual.
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile a worker definition once: reap finished workers, submit a new one
    Enqueue(commands::enqueue::EnqueueArgs),

    /// Print the normalized job manifest without contacting a cluster
    Render(commands::render::RenderArgs),
}

impl Cli {
    /// Process-wide configuration assembled from flags and environment
    pub fn autoscaler_config(&self) -> AutoscalerConfig {
        AutoscalerConfig {
            enabled: self.enabled,
            max_workers: self.max_workers,
            retry: RetryConfig::with_max_attempts(self.retry_attempts),
            ..Default::default()
        }
    }

    /// Run the CLI command
    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.autoscaler_config();
        match self.command {
            Commands::Enqueue(args) => commands::enqueue::run(args, config, self.kubeconfig).await,
            Commands::Render(args) => commands::render::run(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_reconciliation_off() {
        let cli = Cli::try_parse_from(["jobpool", "render", "--definition", "def.yaml"]).unwrap();
        let config = cli.autoscaler_config();
        assert!(!config.enabled);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "jobpool",
            "enqueue",
            "--definition",
            "def.yaml",
            "--enabled",
            "--max-workers",
            "4",
            "--retry-attempts",
            "1",
        ])
        .unwrap();
        let config = cli.autoscaler_config();
        assert!(config.enabled);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn zero_retry_attempts_is_rejected() {
        let parsed = Cli::try_parse_from([
            "jobpool",
            "enqueue",
            "--definition",
            "def.yaml",
            "--retry-attempts",
            "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn kubeconfig_flag_is_optional() {
        let cli = Cli::try_parse_from(["jobpool", "render", "--definition", "def.yaml"]).unwrap();
        assert_eq!(cli.kubeconfig, None);

        let cli = Cli::try_parse_from([
            "jobpool",
            "render",
            "--definition",
            "def.yaml",
            "--kubeconfig",
            "/tmp/kc",
        ])
        .unwrap();
        assert_eq!(cli.kubeconfig, Some(PathBuf::from("/tmp/kc")));
    }

    #[test]
    fn definition_is_required() {
        assert!(Cli::try_parse_from(["jobpool", "enqueue"]).is_err());
    }
}
