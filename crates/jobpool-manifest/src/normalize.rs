//! Job manifest normalization
//!
//! Steps run in a fixed order since later ones read what earlier ones set:
//! namespace, labels, unique name, restart policy, `INTERVAL`.

use serde_json::{Map, Value};

use jobpool_common::labels::{GROUP_LABEL, JOB_MARKER, MARKER_LABEL, POD_MARKER};
use jobpool_common::DEFAULT_NAMESPACE;

use crate::error::ManifestError;
use crate::manifest::Manifest;
use crate::random::random_suffix;

/// Restart policy applied to the pod template when the caller sets none
pub const DEFAULT_RESTART_POLICY: &str = "OnFailure";

/// Container environment variable forced to "0" so workers make a single pass
pub const INTERVAL_ENV: &str = "INTERVAL";

/// Produce a submission-ready copy of a worker Job manifest.
///
/// `context_namespace` is the connection context's default namespace, used
/// only when the manifest names none. Fails if `metadata.name` is missing.
pub fn normalize(
    manifest: &Manifest,
    context_namespace: Option<&str>,
) -> Result<Manifest, ManifestError> {
    let group = group_name(manifest)?.to_string();
    let mut normalized = manifest.clone();

    ensure_namespace(&mut normalized, context_namespace)?;
    inject_labels(&mut normalized, &group)?;
    set_unique_name(&mut normalized, &group)?;
    default_restart_policy(&mut normalized)?;
    zero_interval(&mut normalized);

    Ok(normalized)
}

/// Namespace a manifest will be submitted to.
///
/// Manifest value wins, then the connection context, then "default".
pub fn resolve_namespace(manifest: &Manifest, context_namespace: Option<&str>) -> String {
    manifest
        .namespace()
        .or(context_namespace.filter(|ns| !ns.is_empty()))
        .unwrap_or(DEFAULT_NAMESPACE)
        .to_string()
}

/// Write the resolved namespace into `metadata.namespace`
pub fn ensure_namespace(
    manifest: &mut Manifest,
    context_namespace: Option<&str>,
) -> Result<(), ManifestError> {
    if manifest.namespace().is_some() {
        return Ok(());
    }
    let namespace = resolve_namespace(manifest, context_namespace);
    manifest
        .mapping_mut(&["metadata"])?
        .insert("namespace".to_string(), Value::String(namespace));
    Ok(())
}

/// Whether the manifest already went through [`normalize`]
pub fn is_normalized(manifest: &Manifest) -> bool {
    manifest.label(MARKER_LABEL) == Some(JOB_MARKER)
        && manifest.label(GROUP_LABEL).is_some_and(|g| !g.is_empty())
}

/// Worker group a manifest belongs to.
///
/// This is the name the caller declared. For an already normalized manifest
/// it is the group label, since the name by then carries a suffix.
pub fn group_name(manifest: &Manifest) -> Result<&str, ManifestError> {
    let name = manifest.name().ok_or(ManifestError::MissingName)?;
    if is_normalized(manifest) {
        Ok(manifest.label(GROUP_LABEL).unwrap_or(name))
    } else {
        Ok(name)
    }
}

fn inject_labels(manifest: &mut Manifest, group: &str) -> Result<(), ManifestError> {
    let job_labels = manifest.mapping_mut(&["metadata", "labels"])?;
    job_labels.insert(MARKER_LABEL.to_string(), Value::from(JOB_MARKER));
    job_labels.insert(GROUP_LABEL.to_string(), Value::from(group));

    manifest
        .mapping_mut(&["spec", "template", "metadata", "labels"])?
        .insert(MARKER_LABEL.to_string(), Value::from(POD_MARKER));
    Ok(())
}

fn set_unique_name(manifest: &mut Manifest, base: &str) -> Result<(), ManifestError> {
    let name = format!("{}-{}", base, random_suffix());
    manifest
        .mapping_mut(&["metadata"])?
        .insert("name".to_string(), Value::String(name));
    Ok(())
}

fn default_restart_policy(manifest: &mut Manifest) -> Result<(), ManifestError> {
    let pod_spec = manifest.mapping_mut(&["spec", "template", "spec"])?;
    let policy = pod_spec
        .entry("restartPolicy".to_string())
        .or_insert(Value::Null);
    if policy.is_null() {
        *policy = Value::from(DEFAULT_RESTART_POLICY);
    }
    Ok(())
}

/// Force existing `INTERVAL` entries to "0". Never adds an entry.
fn zero_interval(manifest: &mut Manifest) {
    let Ok(pod_spec) = manifest.mapping_mut(&["spec", "template", "spec"]) else {
        return;
    };
    let Some(containers) = pod_spec.get_mut("containers").and_then(Value::as_array_mut) else {
        return;
    };

    for env in containers
        .iter_mut()
        .filter_map(|c| c.get_mut("env"))
        .filter_map(Value::as_array_mut)
    {
        for entry in env.iter_mut().filter_map(Value::as_object_mut) {
            if entry.get("name").and_then(Value::as_str) == Some(INTERVAL_ENV) {
                override_value(entry);
            }
        }
    }
}

fn override_value(entry: &mut Map<String, Value>) {
    // value and valueFrom are mutually exclusive in an EnvVar
    entry.remove("valueFrom");
    entry.insert("value".to_string(), Value::from("0"));
}
