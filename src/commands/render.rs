//! Render command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use jobpool_controller::{WorkerDefinition, WorkerOwner};
use jobpool_manifest::normalize;

use super::load_definition;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Worker definition YAML file
    #[arg(long)]
    pub definition: PathBuf,

    /// Namespace to assume when the manifest names none
    #[arg(long)]
    pub namespace: Option<String>,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let definition = load_definition(&args.definition)?;
    print!("{}", render(&definition, args.namespace.as_deref())?);
    Ok(())
}

/// Normalized job manifest of `definition`, as YAML
pub fn render(
    definition: &WorkerDefinition,
    namespace: Option<&str>,
) -> anyhow::Result<String> {
    let job = normalize(&definition.job_manifest()?, namespace)
        .context("failed to normalize job manifest")?;
    Ok(job.to_yaml()?)
}
