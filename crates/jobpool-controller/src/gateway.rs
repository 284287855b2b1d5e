//! Remote job API gateway
//!
//! Three scoped clients (worker Jobs, worker Pods, setup resources) behind
//! traits so the reconciler can be exercised against mocks while production
//! code talks to the API server through [`crate::kube_gateway::KubeGateway`].

use std::sync::Arc;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use jobpool_common::Error;
use jobpool_manifest::{Manifest, ManifestError};

/// Phase a pod reports once all of its containers exited successfully
pub const SUCCEEDED_PHASE: &str = "Succeeded";

/// Terminated reason of a container that ran to completion
pub const COMPLETED_REASON: &str = "Completed";

/// Label selector plus optional namespace for list calls
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelQuery {
    /// Kubernetes label selector (e.g. "resque-kubernetes=job")
    pub selector: String,
    /// Namespace to list in; `None` lists across all namespaces
    pub namespace: Option<String>,
}

impl LabelQuery {
    /// Query every namespace
    pub fn all_namespaces(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            namespace: None,
        }
    }

    /// Query one namespace
    pub fn in_namespace(selector: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            namespace: Some(namespace.into()),
        }
    }
}

/// What the reconciler needs to know about a listed Job
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Job name
    pub name: String,
    /// Job namespace
    pub namespace: String,
    /// `spec.completions`
    pub completions: Option<i32>,
    /// `status.succeeded`
    pub succeeded: Option<i32>,
}

impl JobSummary {
    /// A job is finished once it has as many successes as it declared completions.
    ///
    /// The API omits `succeeded` while it is zero and defaults `completions`
    /// to 1 for non-parallel jobs.
    pub fn is_finished(&self) -> bool {
        self.succeeded.unwrap_or(0) == self.completions.unwrap_or(1)
    }
}

/// What the reconciler needs to know about a listed Pod
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodSummary {
    /// Pod name
    pub name: String,
    /// Pod namespace
    pub namespace: String,
    /// `status.phase`
    pub phase: Option<String>,
    /// `state.terminated.reason` of each container status, in order
    pub container_reasons: Vec<Option<String>>,
}

impl PodSummary {
    /// A pod is finished when it succeeded and every container completed.
    ///
    /// An OOM-killed container can leave the pod in phase Succeeded with
    /// reason "OOMKilled"; such pods are kept for inspection.
    pub fn is_finished(&self) -> bool {
        self.phase.as_deref() == Some(SUCCEEDED_PHASE)
            && self
                .container_reasons
                .iter()
                .all(|reason| reason.as_deref() == Some(COMPLETED_REASON))
    }
}

/// Identity of a resource the API server accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource kind
    pub kind: String,
    /// Resource name as stored
    pub name: String,
    /// Resource namespace
    pub namespace: String,
}

/// Auxiliary resource kinds a worker may create before its job is scheduled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetupKind {
    /// core/v1 ConfigMap
    ConfigMap,
    /// core/v1 Secret
    Secret,
    /// core/v1 Service
    Service,
    /// core/v1 ServiceAccount
    ServiceAccount,
    /// core/v1 PersistentVolumeClaim
    PersistentVolumeClaim,
    /// core/v1 ResourceQuota
    ResourceQuota,
    /// core/v1 LimitRange
    LimitRange,
    /// rbac.authorization.k8s.io/v1 Role
    Role,
    /// rbac.authorization.k8s.io/v1 RoleBinding
    RoleBinding,
    /// networking.k8s.io/v1 NetworkPolicy
    NetworkPolicy,
}

impl SetupKind {
    const TABLE: &'static [(&'static str, SetupKind)] = &[
        ("configmap", SetupKind::ConfigMap),
        ("secret", SetupKind::Secret),
        ("service", SetupKind::Service),
        ("serviceaccount", SetupKind::ServiceAccount),
        ("persistentvolumeclaim", SetupKind::PersistentVolumeClaim),
        ("resourcequota", SetupKind::ResourceQuota),
        ("limitrange", SetupKind::LimitRange),
        ("role", SetupKind::Role),
        ("rolebinding", SetupKind::RoleBinding),
        ("networkpolicy", SetupKind::NetworkPolicy),
    ];

    /// Look up a manifest `kind`, case-insensitively
    pub fn from_kind(kind: &str) -> Result<Self, ManifestError> {
        let lower = kind.to_lowercase();
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ManifestError::UnsupportedKind(kind.to_string()))
    }

    /// Lowercased kind, as used in operation names
    pub fn as_str(&self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// Name of the create operation for this kind (e.g. "create_configmap")
    pub fn operation_name(&self) -> String {
        format!("create_{}", self.as_str())
    }
}

impl std::fmt::Display for SetupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker Job operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobClient: Send + Sync {
    /// List Jobs matching a label selector
    async fn list_jobs(&self, query: &LabelQuery) -> Result<Vec<JobSummary>, Error>;

    /// Submit a Job manifest; its namespace must already be resolved
    async fn create_job(&self, manifest: &Manifest) -> Result<ResourceRef, Error>;

    /// Delete a Job; fails with [`Error::NotFound`] if it is already gone
    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), Error>;
}

/// Worker Pod operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PodClient: Send + Sync {
    /// List Pods matching a label selector
    async fn list_pods(&self, query: &LabelQuery) -> Result<Vec<PodSummary>, Error>;

    /// Delete a Pod; fails with [`Error::NotFound`] if it is already gone
    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), Error>;
}

/// Setup resource operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MiscClient: Send + Sync {
    /// Create a setup resource of the given kind
    async fn create_resource(
        &self,
        kind: SetupKind,
        manifest: &Manifest,
    ) -> Result<ResourceRef, Error>;
}

/// The three scoped clients plus the connection context's default namespace
#[derive(Clone)]
pub struct Gateway {
    /// Worker Job client
    pub jobs: Arc<dyn JobClient>,
    /// Worker Pod client
    pub pods: Arc<dyn PodClient>,
    /// Setup resource client
    pub misc: Arc<dyn MiscClient>,
    default_namespace: Option<String>,
}

impl Gateway {
    /// Assemble a gateway from individual clients
    pub fn new(
        jobs: Arc<dyn JobClient>,
        pods: Arc<dyn PodClient>,
        misc: Arc<dyn MiscClient>,
        default_namespace: Option<String>,
    ) -> Self {
        Self {
            jobs,
            pods,
            misc,
            default_namespace,
        }
    }

    /// Serve all three scopes from one client
    pub fn from_client<C>(client: C, default_namespace: Option<String>) -> Self
    where
        C: JobClient + PodClient + MiscClient + 'static,
    {
        let client = Arc::new(client);
        Self::new(client.clone(), client.clone(), client, default_namespace)
    }

    /// Namespace the connection context defaults to, if any
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(completions: Option<i32>, succeeded: Option<i32>) -> JobSummary {
        JobSummary {
            name: "thing-abcde".to_string(),
            namespace: "default".to_string(),
            completions,
            succeeded,
        }
    }

    fn pod(phase: &str, reasons: &[&str]) -> PodSummary {
        PodSummary {
            name: "thing-abcde-xyz12".to_string(),
            namespace: "default".to_string(),
            phase: Some(phase.to_string()),
            container_reasons: reasons.iter().map(|r| Some(r.to_string())).collect(),
        }
    }

    #[test]
    fn job_finished_when_succeeded_matches_completions() {
        assert!(job(Some(1), Some(1)).is_finished());
        assert!(job(Some(3), Some(3)).is_finished());
        assert!(!job(Some(1), Some(0)).is_finished());
        assert!(!job(Some(3), Some(2)).is_finished());
    }

    #[test]
    fn job_missing_counters_use_api_defaults() {
        assert!(!job(Some(1), None).is_finished());
        assert!(!job(None, None).is_finished());
        assert!(job(None, Some(1)).is_finished());
    }

    #[test]
    fn pod_finished_only_when_all_containers_completed() {
        assert!(pod("Succeeded", &["Completed"]).is_finished());
        assert!(pod("Succeeded", &["Completed", "Completed"]).is_finished());
        assert!(!pod("Succeeded", &["OOMKilled"]).is_finished());
        assert!(!pod("Succeeded", &["Completed", "OOMKilled"]).is_finished());
        assert!(!pod("Running", &[]).is_finished());
    }

    #[test]
    fn pod_without_terminated_state_is_not_finished() {
        let mut p = pod("Succeeded", &[]);
        p.container_reasons = vec![None];
        assert!(!p.is_finished());
    }

    #[test]
    fn setup_kind_lookup_is_case_insensitive() {
        assert_eq!(SetupKind::from_kind("ConfigMap").unwrap(), SetupKind::ConfigMap);
        assert_eq!(SetupKind::from_kind("ROLEBINDING").unwrap(), SetupKind::RoleBinding);
        assert_eq!(SetupKind::ConfigMap.operation_name(), "create_configmap");
    }

    #[test]
    fn unknown_setup_kind_is_rejected() {
        match SetupKind::from_kind("FakeResource") {
            Err(ManifestError::UnsupportedKind(kind)) => assert_eq!(kind, "FakeResource"),
            other => panic!("expected UnsupportedKind, got {other:?}"),
        }
    }
}
