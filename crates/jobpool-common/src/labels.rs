//! Label keys and values attached to worker resources
//!
//! These are wire-visible: resources created by earlier deployments carry
//! the same pairs, so changing any of them orphans jobs already running.

/// Marker label key present on every worker Job and worker Pod
pub const MARKER_LABEL: &str = "resque-kubernetes";

/// Marker value identifying a worker Job
pub const JOB_MARKER: &str = "job";

/// Marker value identifying a worker Pod (set on the Job's pod template)
pub const POD_MARKER: &str = "pod";

/// Label key carrying the logical group (the manifest's base name)
pub const GROUP_LABEL: &str = "resque-kubernetes-group";

/// Selector matching every worker Job
pub fn job_selector() -> String {
    format!("{MARKER_LABEL}={JOB_MARKER}")
}

/// Selector matching every worker Pod
pub fn pod_selector() -> String {
    format!("{MARKER_LABEL}={POD_MARKER}")
}

/// Selector matching worker Jobs of one group
pub fn group_selector(group: &str) -> String {
    format!("{MARKER_LABEL}={JOB_MARKER},{GROUP_LABEL}={group}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_wire_format() {
        assert_eq!(job_selector(), "resque-kubernetes=job");
        assert_eq!(pod_selector(), "resque-kubernetes=pod");
        assert_eq!(
            group_selector("thing"),
            "resque-kubernetes=job,resque-kubernetes-group=thing"
        );
    }
}
