//! Untyped Kubernetes manifest
//!
//! Manifests are kept as JSON mappings rather than typed `k8s_openapi`
//! structs so fields the caller sets survive normalization untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ManifestError;

/// A nested mapping describing one Kubernetes resource
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    /// Build from any JSON value; only mappings are accepted
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ManifestError::NotAMapping),
        }
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Consume into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Look up a nested value by key path
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(*key))
    }

    /// `metadata.name`
    pub fn name(&self) -> Option<&str> {
        self.get_path(&["metadata", "name"]).and_then(Value::as_str)
    }

    /// `metadata.namespace`, treating an empty string as unset
    pub fn namespace(&self) -> Option<&str> {
        self.get_path(&["metadata", "namespace"])
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
    }

    /// Top-level `kind`, treating an empty string as unset
    pub fn kind(&self) -> Option<&str> {
        self.0
            .get("kind")
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
    }

    /// A `metadata.labels` entry
    pub fn label(&self, key: &str) -> Option<&str> {
        self.get_path(&["metadata", "labels", key])
            .and_then(Value::as_str)
    }

    /// Mutable mapping at `path`, creating empty mappings along the way.
    ///
    /// A `null` on the path is replaced; any other non-mapping value is an error.
    pub(crate) fn mapping_mut(
        &mut self,
        path: &[&str],
    ) -> Result<&mut Map<String, Value>, ManifestError> {
        let mut current = &mut self.0;
        for (depth, key) in path.iter().enumerate() {
            let slot = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            current = slot
                .as_object_mut()
                .ok_or_else(|| ManifestError::InvalidField {
                    path: path[..=depth].join("."),
                })?;
        }
        Ok(current)
    }
}
