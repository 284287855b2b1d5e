//! CLI commands

use std::path::Path;

use anyhow::Context;

use jobpool_controller::WorkerDefinition;

pub mod enqueue;
pub mod render;

/// Read and parse a worker definition file
pub fn load_definition(path: &Path) -> anyhow::Result<WorkerDefinition> {
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read definition {}", path.display()))?;
    WorkerDefinition::from_yaml(&yaml)
        .with_context(|| format!("invalid definition {}", path.display()))
}
