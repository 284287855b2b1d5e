//! The task side of reconciliation
//!
//! An owner is whatever triggered the reconciliation: it supplies the worker
//! Job manifest, optionally its own worker ceiling, and any setup manifests
//! that must exist before the job runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use jobpool_manifest::{Manifest, ManifestError};

/// Failure raised by an owner while producing a manifest
#[derive(Debug, thiserror::Error)]
pub enum OwnerError {
    #[error("no setup manifest producer named '{0}'")]
    UnknownProducer(String),

    #[error("setup manifest producer '{0}' is defined more than once")]
    DuplicateProducer(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Other(String),
}

/// Supplier of the manifests a reconciliation acts on
pub trait WorkerOwner: Send + Sync {
    /// The worker Job manifest, before normalization
    fn job_manifest(&self) -> Result<Manifest, OwnerError>;

    /// Per-owner ceiling on active jobs; `None` uses the configured default
    fn max_workers(&self) -> Option<u32> {
        None
    }

    /// Names of setup manifest producers, in the order they must run
    fn setup_producers(&self) -> Vec<String> {
        Vec::new()
    }

    /// Produce the setup manifest registered under `producer`
    fn setup_manifest(&self, producer: &str) -> Result<Manifest, OwnerError> {
        Err(OwnerError::UnknownProducer(producer.to_string()))
    }
}

/// A named setup manifest in a [`WorkerDefinition`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetupEntry {
    /// Producer name
    pub name: String,
    /// Manifest to create
    pub manifest: Manifest,
}

/// Owner described by a YAML document
///
/// ```yaml
/// maxWorkers: 5
/// job:
///   apiVersion: batch/v1
///   kind: Job
///   metadata:
///     name: worker-job
///   spec: ...
/// setup:
///   - name: queue-config
///     manifest:
///       apiVersion: v1
///       kind: ConfigMap
///       ...
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDefinition {
    /// Per-owner ceiling on active jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<u32>,
    /// Worker Job manifest
    pub job: Manifest,
    /// Setup manifests, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<SetupEntry>,
}

impl WorkerDefinition {
    /// Definition with just a job manifest
    pub fn new(job: Manifest) -> Self {
        Self {
            max_workers: None,
            job,
            setup: Vec::new(),
        }
    }

    /// Parse from YAML, rejecting setup entries that share a name
    pub fn from_yaml(yaml: &str) -> Result<Self, OwnerError> {
        let definition: Self = serde_yaml::from_str(yaml).map_err(ManifestError::from)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check that every setup producer name is unique
    pub fn validate(&self) -> Result<(), OwnerError> {
        let mut seen = HashSet::new();
        match self.setup.iter().find(|entry| !seen.insert(entry.name.as_str())) {
            Some(entry) => Err(OwnerError::DuplicateProducer(entry.name.clone())),
            None => Ok(()),
        }
    }

    /// Set the per-owner worker ceiling
    pub fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    /// Append a setup manifest
    pub fn with_setup(mut self, name: impl Into<String>, manifest: Manifest) -> Self {
        self.setup.push(SetupEntry {
            name: name.into(),
            manifest,
        });
        self
    }
}

impl WorkerOwner for WorkerDefinition {
    fn job_manifest(&self) -> Result<Manifest, OwnerError> {
        Ok(self.job.clone())
    }

    fn max_workers(&self) -> Option<u32> {
        self.max_workers
    }

    fn setup_producers(&self) -> Vec<String> {
        self.setup.iter().map(|entry| entry.name.clone()).collect()
    }

    fn setup_manifest(&self, producer: &str) -> Result<Manifest, OwnerError> {
        self.setup
            .iter()
            .find(|entry| entry.name == producer)
            .map(|entry| entry.manifest.clone())
            .ok_or_else(|| OwnerError::UnknownProducer(producer.to_string()))
    }
}
