//! Setup resources applied ahead of the worker Job
//!
//! Setup manifests get namespace resolution only. They are not worker Jobs,
//! so no labels, suffix, restart policy or interval treatment. They are
//! created on every trigger; making repeated creates harmless is up to the
//! owner. A failure stops the pass and earlier creates are left in place.

use tracing::info;

use jobpool_manifest::{ensure_namespace, Manifest, ManifestError};

use crate::error::ReconcileError;
use crate::gateway::{MiscClient, SetupKind};
use crate::owner::WorkerOwner;

/// Validate a setup manifest and resolve its namespace
pub fn prepare_setup_manifest(
    manifest: &Manifest,
    context_namespace: Option<&str>,
) -> Result<(SetupKind, Manifest), ManifestError> {
    let kind = manifest.kind().ok_or(ManifestError::MissingKind)?;
    let kind = SetupKind::from_kind(kind)?;

    let mut prepared = manifest.clone();
    ensure_namespace(&mut prepared, context_namespace)?;
    Ok((kind, prepared))
}

/// Create every setup resource the owner registers, in order.
///
/// Returns the number of resources created.
pub async fn apply_setup(
    owner: &dyn WorkerOwner,
    misc: &dyn MiscClient,
    context_namespace: Option<&str>,
) -> Result<usize, ReconcileError> {
    let producers = owner.setup_producers();

    for producer in &producers {
        let manifest =
            owner
                .setup_manifest(producer)
                .map_err(|source| ReconcileError::Producer {
                    producer: producer.clone(),
                    source,
                })?;

        let (kind, prepared) = prepare_setup_manifest(&manifest, context_namespace)?;
        let created = misc.create_resource(kind, &prepared).await?;

        info!(
            producer = %producer,
            operation = %kind.operation_name(),
            name = %created.name,
            namespace = %created.namespace,
            "created setup resource"
        );
    }

    Ok(producers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockMiscClient, ResourceRef};
    use crate::owner::WorkerDefinition;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Manifest {
        Manifest::from_value(value).unwrap()
    }

    fn job() -> Manifest {
        manifest(json!({"metadata": {"name": "thing"}}))
    }

    fn config_map(namespace: Option<&str>) -> Manifest {
        let mut value = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "queue-config"},
            "data": {"queue": "high-memory"}
        });
        if let Some(ns) = namespace {
            value["metadata"]["namespace"] = json!(ns);
        }
        manifest(value)
    }

    fn echo_created(kind: SetupKind, m: &Manifest) -> Result<ResourceRef, jobpool_common::Error> {
        Ok(ResourceRef {
            kind: kind.to_string(),
            name: m.name().unwrap_or_default().to_string(),
            namespace: m.namespace().unwrap_or_default().to_string(),
        })
    }

    #[test]
    fn missing_kind_is_rejected() {
        let m = manifest(json!({"metadata": {"name": "thing"}, "spec": {}}));
        assert!(matches!(
            prepare_setup_manifest(&m, None),
            Err(ManifestError::MissingKind)
        ));
    }

    #[test]
    fn namespace_only_is_resolved() {
        let (kind, prepared) = prepare_setup_manifest(&config_map(None), Some("space")).unwrap();
        assert_eq!(kind, SetupKind::ConfigMap);
        assert_eq!(prepared.namespace(), Some("space"));
        assert_eq!(prepared.name(), Some("queue-config"));
        assert_eq!(prepared.label("resque-kubernetes"), None);
    }

    #[tokio::test]
    async fn creates_each_setup_resource_in_order() {
        let owner = WorkerDefinition::new(job())
            .with_setup("first", config_map(None))
            .with_setup("second", config_map(Some("staging")));

        let mut misc = MockMiscClient::new();
        let mut seq = mockall::Sequence::new();
        misc.expect_create_resource()
            .withf(|kind, m| *kind == SetupKind::ConfigMap && m.namespace() == Some("default"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(echo_created);
        misc.expect_create_resource()
            .withf(|_, m| m.namespace() == Some("staging"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(echo_created);

        let created = apply_setup(&owner, &misc, None).await.unwrap();
        assert_eq!(created, 2);
    }

    #[tokio::test]
    async fn missing_kind_creates_nothing() {
        let owner = WorkerDefinition::new(job())
            .with_setup("real_job_wo_kind", manifest(json!({"metadata": {"name": "thing"}})));

        let mut misc = MockMiscClient::new();
        misc.expect_create_resource().times(0);

        let err = apply_setup(&owner, &misc, None).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Manifest(ManifestError::MissingKind)
        ));
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let owner = WorkerDefinition::new(job())
            .with_setup("good", config_map(None))
            .with_setup("bad", manifest(json!({"kind": "FakeResource", "metadata": {"name": "x"}})))
            .with_setup("never", config_map(None));

        let mut misc = MockMiscClient::new();
        misc.expect_create_resource()
            .times(1)
            .returning(echo_created);

        let err = apply_setup(&owner, &misc, None).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Manifest(ManifestError::UnsupportedKind(_))
        ));
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let owner = WorkerDefinition::new(job()).with_setup("cfg", config_map(None));

        let mut misc = MockMiscClient::new();
        misc.expect_create_resource().returning(|_, _| {
            Err(jobpool_common::Error::Rejected {
                operation: "create_configmap".to_string(),
                code: 409,
                message: "already exists".to_string(),
            })
        });

        let err = apply_setup(&owner, &misc, None).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Gateway(_)));
    }

    #[tokio::test]
    async fn no_producers_is_a_no_op() {
        let owner = WorkerDefinition::new(job());
        let misc = MockMiscClient::new();
        assert_eq!(apply_setup(&owner, &misc, None).await.unwrap(), 0);
    }
}
