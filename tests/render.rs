//! Definition loading and rendering, no cluster required

use std::io::Write;

use jobpool::commands::load_definition;
use jobpool::commands::render::render;
use serde_yaml::Value;

const DEFINITION: &str = r#"
maxWorkers: 2
job:
  apiVersion: batch/v1
  kind: Job
  metadata:
    name: thing
  spec:
    template:
      spec:
        containers:
          - name: worker
            image: worker:latest
            env:
              - name: INTERVAL
                value: "5"
"#;

fn write_definition(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn renders_normalized_job() {
    let file = write_definition(DEFINITION);
    let definition = load_definition(file.path()).unwrap();

    let rendered: Value = serde_yaml::from_str(&render(&definition, Some("space")).unwrap()).unwrap();

    let name = rendered["metadata"]["name"].as_str().unwrap();
    assert!(name.starts_with("thing-"));
    assert_eq!(rendered["metadata"]["namespace"].as_str(), Some("space"));
    assert_eq!(
        rendered["metadata"]["labels"]["resque-kubernetes-group"].as_str(),
        Some("thing")
    );
    let pod_spec = &rendered["spec"]["template"]["spec"];
    assert_eq!(pod_spec["restartPolicy"].as_str(), Some("OnFailure"));
    assert_eq!(pod_spec["containers"][0]["env"][0]["value"].as_str(), Some("0"));
}

#[test]
fn renders_default_namespace_without_context() {
    let file = write_definition(DEFINITION);
    let definition = load_definition(file.path()).unwrap();

    let rendered: Value = serde_yaml::from_str(&render(&definition, None).unwrap()).unwrap();
    assert_eq!(rendered["metadata"]["namespace"].as_str(), Some("default"));
}

#[test]
fn nameless_job_fails_to_render() {
    let file = write_definition("job:\n  metadata: {}\n");
    let definition = load_definition(file.path()).unwrap();
    assert!(render(&definition, None).is_err());
}

#[test]
fn missing_file_is_reported() {
    let err = load_definition(std::path::Path::new("/nonexistent/def.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/def.yaml"));
}

#[test]
fn duplicate_setup_names_fail_to_load() {
    let file = write_definition(
        "job:\n  metadata:\n    name: thing\nsetup:\n  - name: cfg\n    manifest: {kind: ConfigMap}\n  - name: cfg\n    manifest: {kind: Secret}\n",
    );
    let err = load_definition(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("more than once"));
}
