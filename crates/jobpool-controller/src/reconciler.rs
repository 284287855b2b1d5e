//! Worker pool reconciliation
//!
//! One pass per trigger, in this order:
//! 1. Apply the owner's setup resources
//! 2. Reap finished worker Jobs
//! 3. Reap finished worker Pods
//! 4. Count active Jobs in the owner's group
//! 5. Submit a normalized Job if the count is under the ceiling
//!
//! Reaping comes first so finished jobs never count against the ceiling.
//! The count-then-create step is not atomic against the API server, so
//! concurrent triggers elsewhere can briefly overshoot the ceiling.

use tracing::{debug, info, instrument};

use jobpool_common::labels;
use jobpool_common::AutoscalerConfig;
use jobpool_manifest::{group_name, normalize, resolve_namespace};

use crate::error::ReconcileError;
use crate::gateway::{Gateway, LabelQuery};
use crate::owner::WorkerOwner;
use crate::setup::apply_setup;

/// What a reconciliation decided
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Autoscaling is switched off; nothing was touched
    Disabled,
    /// The group already has `limit` or more active jobs
    AtCapacity {
        group: String,
        active: usize,
        limit: u32,
    },
    /// A new worker job was submitted
    Created { name: String, namespace: String },
}

/// Summary of one reconciliation pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub setup_created: usize,
    pub reaped_jobs: usize,
    pub reaped_pods: usize,
    pub outcome: ReconcileOutcome,
}

impl ReconcileReport {
    fn disabled() -> Self {
        Self {
            setup_created: 0,
            reaped_jobs: 0,
            reaped_pods: 0,
            outcome: ReconcileOutcome::Disabled,
        }
    }

    /// Whether a new job was submitted
    pub fn created(&self) -> bool {
        matches!(self.outcome, ReconcileOutcome::Created { .. })
    }
}

/// Reaps finished workers and submits new ones up to a ceiling
pub struct Reconciler {
    config: AutoscalerConfig,
    gateway: Gateway,
}

impl Reconciler {
    /// Create a reconciler over the given gateway
    pub fn new(config: AutoscalerConfig, gateway: Gateway) -> Self {
        Self { config, gateway }
    }

    /// Run one reconciliation pass for `owner`.
    ///
    /// Every error other than a job or pod vanishing mid-reap aborts the
    /// pass. Nothing is rolled back; the next trigger observes the cluster
    /// afresh.
    #[instrument(skip_all)]
    pub async fn reconcile(
        &self,
        owner: &dyn WorkerOwner,
    ) -> Result<ReconcileReport, ReconcileError> {
        if !self.config.enabled {
            debug!("autoscaling disabled, skipping reconciliation");
            return Ok(ReconcileReport::disabled());
        }

        let context_namespace = self.gateway.default_namespace();

        let setup_created =
            apply_setup(owner, self.gateway.misc.as_ref(), context_namespace).await?;
        let reaped_jobs = self.reap_finished_jobs().await?;
        let reaped_pods = self.reap_finished_pods().await?;

        let manifest = owner.job_manifest()?;
        let group = group_name(&manifest)?;
        let namespace = resolve_namespace(&manifest, context_namespace);

        let active = self.count_active_jobs(group, &namespace).await?;
        let limit = owner.max_workers().unwrap_or(self.config.max_workers);

        let outcome = if active >= limit as usize {
            info!(
                group = %group,
                namespace = %namespace,
                active,
                limit,
                "worker ceiling reached, not creating job"
            );
            ReconcileOutcome::AtCapacity {
                group: group.to_string(),
                active,
                limit,
            }
        } else {
            let job = normalize(&manifest, context_namespace)?;
            let created = self.gateway.jobs.create_job(&job).await?;
            info!(
                group = %group,
                job = %created.name,
                namespace = %created.namespace,
                active,
                limit,
                "submitted worker job"
            );
            ReconcileOutcome::Created {
                name: created.name,
                namespace: created.namespace,
            }
        };

        Ok(ReconcileReport {
            setup_created,
            reaped_jobs,
            reaped_pods,
            outcome,
        })
    }

    /// Delete every finished worker Job, in any namespace
    pub async fn reap_finished_jobs(&self) -> Result<usize, ReconcileError> {
        let jobs = self
            .gateway
            .jobs
            .list_jobs(&LabelQuery::all_namespaces(labels::job_selector()))
            .await?;

        let mut reaped = 0;
        for job in jobs.iter().filter(|job| job.is_finished()) {
            match self.gateway.jobs.delete_job(&job.name, &job.namespace).await {
                Ok(()) => {
                    reaped += 1;
                    debug!(job = %job.name, namespace = %job.namespace, "reaped finished job");
                }
                Err(e) if e.is_not_found() => {
                    debug!(job = %job.name, namespace = %job.namespace, "finished job already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(reaped)
    }

    /// Delete every finished worker Pod, in any namespace
    pub async fn reap_finished_pods(&self) -> Result<usize, ReconcileError> {
        let pods = self
            .gateway
            .pods
            .list_pods(&LabelQuery::all_namespaces(labels::pod_selector()))
            .await?;

        let mut reaped = 0;
        for pod in pods.iter().filter(|pod| pod.is_finished()) {
            match self.gateway.pods.delete_pod(&pod.name, &pod.namespace).await {
                Ok(()) => {
                    reaped += 1;
                    debug!(pod = %pod.name, namespace = %pod.namespace, "reaped finished pod");
                }
                Err(e) if e.is_not_found() => {
                    debug!(pod = %pod.name, namespace = %pod.namespace, "finished pod already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(reaped)
    }

    /// Number of unfinished worker Jobs in `group`
    pub async fn count_active_jobs(
        &self,
        group: &str,
        namespace: &str,
    ) -> Result<usize, ReconcileError> {
        let jobs = self
            .gateway
            .jobs
            .list_jobs(&LabelQuery::in_namespace(
                labels::group_selector(group),
                namespace,
            ))
            .await?;
        Ok(jobs.iter().filter(|job| !job.is_finished()).count())
    }
}
