//! Kubernetes implementation of the gateway clients
//!
//! Lists go through typed `k8s_openapi` resources and are reduced to
//! summaries. Creates go through `DynamicObject` so every field of the
//! caller's manifest reaches the API server. Each call is wrapped in the
//! configured retry policy.

use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, LimitRange, PersistentVolumeClaim, Pod, ResourceQuota, Secret, Service,
    ServiceAccount,
};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::TypeMeta;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config, ResourceExt};
use tracing::{debug, info};

use jobpool_common::retry::{retry_with_backoff_if, RetryConfig};
use jobpool_common::{AutoscalerConfig, Error, DEFAULT_NAMESPACE};
use jobpool_manifest::Manifest;

use crate::gateway::{
    Gateway, JobClient, JobSummary, LabelQuery, MiscClient, PodClient, PodSummary, ResourceRef,
    SetupKind,
};

/// Where the Kubernetes client comes from
pub enum ConnectionSource {
    /// A client the embedding process already built
    Prebuilt(Client),
    /// An explicit kubeconfig file
    Kubeconfig(PathBuf),
    /// In-cluster service account, falling back to the local kubeconfig
    Infer,
}

impl ConnectionSource {
    /// Explicit kubeconfig if a path is given, otherwise inference
    pub fn from_kubeconfig(path: Option<PathBuf>) -> Self {
        path.map(Self::Kubeconfig).unwrap_or(Self::Infer)
    }
}

/// Resolve a connection and build the gateway on top of it
pub async fn connect(
    source: ConnectionSource,
    config: &AutoscalerConfig,
) -> Result<Gateway, Error> {
    let client = match source {
        ConnectionSource::Prebuilt(client) => client,
        ConnectionSource::Kubeconfig(path) => {
            let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
                Error::config(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let kube_config =
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| Error::config(format!("failed to load kubeconfig: {}", e)))?;
            build_client(kube_config, config)?
        }
        ConnectionSource::Infer => {
            let kube_config = Config::infer()
                .await
                .map_err(|e| Error::config(format!("failed to infer config: {}", e)))?;
            build_client(kube_config, config)?
        }
    };

    let default_namespace = client.default_namespace().to_string();
    debug!(namespace = %default_namespace, "connected to kubernetes");

    Ok(Gateway::from_client(
        KubeGateway::new(client, config.retry.clone()),
        Some(default_namespace),
    ))
}

fn build_client(mut kube_config: Config, config: &AutoscalerConfig) -> Result<Client, Error> {
    kube_config.connect_timeout = Some(config.connect_timeout);
    kube_config.read_timeout = Some(config.read_timeout);
    Client::try_from(kube_config).map_err(|e| {
        Error::internal_with_context("connect", format!("failed to create client: {}", e))
    })
}

/// Gateway clients backed by a kube-rs [`Client`]
#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    retry: RetryConfig,
}

impl KubeGateway {
    /// Wrap a client with the given retry policy
    pub fn new(client: Client, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Run a kube call under the retry policy, classifying its errors
    async fn call<T, F, Fut>(&self, operation: &str, mut request: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, kube::Error>>,
    {
        retry_with_backoff_if(
            &self.retry,
            operation,
            || {
                let fut = request();
                async move { fut.await.map_err(|e| Error::from_kube(operation, e)) }
            },
            Error::is_retryable,
        )
        .await
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn create_dynamic(
        &self,
        operation: &str,
        resource: &ApiResource,
        manifest: &Manifest,
    ) -> Result<ResourceRef, Error> {
        let namespace = manifest
            .namespace()
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();

        let mut obj: DynamicObject = serde_json::from_value(manifest.clone().into_value())
            .map_err(|e| Error::serialization(e.to_string()))?;
        obj.types.get_or_insert_with(|| TypeMeta {
            api_version: resource.api_version.clone(),
            kind: resource.kind.clone(),
        });

        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), &namespace, resource);
        let params = PostParams::default();
        let mut attempts = 0u32;
        let result = self
            .call(operation, || {
                attempts += 1;
                api.create(&params, &obj)
            })
            .await;
        let created = match result {
            Ok(created) => created,
            Err(e) if is_replayed_create(&e, attempts) => {
                let name = obj.name_any();
                debug!(
                    operation = %operation,
                    name = %name,
                    namespace = %namespace,
                    attempts,
                    "create conflicted on retry, earlier attempt was stored"
                );
                self.call(operation, || api.get(&name)).await?
            }
            Err(e) => return Err(e),
        };

        Ok(ResourceRef {
            kind: resource.kind.clone(),
            name: created.name_any(),
            namespace,
        })
    }
}

/// A 409 on a retried create means an earlier attempt reached the server
/// before failing in flight.
fn is_replayed_create(err: &Error, attempts: u32) -> bool {
    attempts > 1 && matches!(err, Error::Rejected { code: 409, .. })
}

#[async_trait]
impl JobClient for KubeGateway {
    async fn list_jobs(&self, query: &LabelQuery) -> Result<Vec<JobSummary>, Error> {
        let api: Api<Job> = self.scoped(query.namespace.as_deref());
        let params = ListParams::default().labels(&query.selector);
        let jobs = self.call("list_jobs", || api.list(&params)).await?;
        Ok(jobs.items.iter().map(JobSummary::from).collect())
    }

    async fn create_job(&self, manifest: &Manifest) -> Result<ResourceRef, Error> {
        let resource = ApiResource::erase::<Job>(&());
        let created = self
            .create_dynamic("create_job", &resource, manifest)
            .await?;
        info!(job = %created.name, namespace = %created.namespace, "created worker job");
        Ok(created)
    }

    async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let params = DeleteParams::default();
        self.call("delete_job", || api.delete(name, &params))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PodClient for KubeGateway {
    async fn list_pods(&self, query: &LabelQuery) -> Result<Vec<PodSummary>, Error> {
        let api: Api<Pod> = self.scoped(query.namespace.as_deref());
        let params = ListParams::default().labels(&query.selector);
        let pods = self.call("list_pods", || api.list(&params)).await?;
        Ok(pods.items.iter().map(PodSummary::from).collect())
    }

    async fn delete_pod(&self, name: &str, namespace: &str) -> Result<(), Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = DeleteParams::default();
        self.call("delete_pod", || api.delete(name, &params))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MiscClient for KubeGateway {
    async fn create_resource(
        &self,
        kind: SetupKind,
        manifest: &Manifest,
    ) -> Result<ResourceRef, Error> {
        self.create_dynamic(&kind.operation_name(), &api_resource(kind), manifest)
            .await
    }
}

/// API coordinates for a setup kind
pub fn api_resource(kind: SetupKind) -> ApiResource {
    match kind {
        SetupKind::ConfigMap => ApiResource::erase::<ConfigMap>(&()),
        SetupKind::Secret => ApiResource::erase::<Secret>(&()),
        SetupKind::Service => ApiResource::erase::<Service>(&()),
        SetupKind::ServiceAccount => ApiResource::erase::<ServiceAccount>(&()),
        SetupKind::PersistentVolumeClaim => ApiResource::erase::<PersistentVolumeClaim>(&()),
        SetupKind::ResourceQuota => ApiResource::erase::<ResourceQuota>(&()),
        SetupKind::LimitRange => ApiResource::erase::<LimitRange>(&()),
        SetupKind::Role => ApiResource::erase::<Role>(&()),
        SetupKind::RoleBinding => ApiResource::erase::<RoleBinding>(&()),
        SetupKind::NetworkPolicy => ApiResource::erase::<NetworkPolicy>(&()),
    }
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            name: job.name_any(),
            namespace: job.namespace().unwrap_or_default(),
            completions: job.spec.as_ref().and_then(|s| s.completions),
            succeeded: job.status.as_ref().and_then(|s| s.succeeded),
        }
    }
}

impl From<&Pod> for PodSummary {
    fn from(pod: &Pod) -> Self {
        let status = pod.status.as_ref();
        Self {
            name: pod.name_any(),
            namespace: pod.namespace().unwrap_or_default(),
            phase: status.and_then(|s| s.phase.clone()),
            container_reasons: status
                .and_then(|s| s.container_statuses.as_ref())
                .map(|statuses| {
                    statuses
                        .iter()
                        .map(|cs| {
                            cs.state
                                .as_ref()
                                .and_then(|state| state.terminated.as_ref())
                                .and_then(|t| t.reason.clone())
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
