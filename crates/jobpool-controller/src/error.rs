//! Reconciliation error types

use jobpool_manifest::ManifestError;

use crate::owner::OwnerError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Gateway(#[from] jobpool_common::Error),

    #[error("job manifest unavailable: {0}")]
    Owner(#[from] OwnerError),

    #[error("setup producer '{producer}' failed: {source}")]
    Producer {
        producer: String,
        source: OwnerError,
    },
}

impl ReconcileError {
    /// Whether the failure came from malformed caller input rather than the cluster
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::Manifest(_))
    }
}
