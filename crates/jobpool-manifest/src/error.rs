//! Manifest-specific error types

/// Malformed manifest input. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest must be a mapping at the top level")]
    NotAMapping,

    #[error("manifest has no metadata.name")]
    MissingName,

    #[error("setup manifest has no kind")]
    MissingKind,

    #[error("unsupported setup resource kind '{0}'")]
    UnsupportedKind(String),

    #[error("manifest field '{path}' must be a mapping")]
    InvalidField { path: String },

    #[error("invalid manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
