//! jobpool CLI
//!
//! Submits worker Jobs for a definition, keeping each group under its ceiling.

use clap::Parser;

use jobpool::Cli;
use jobpool_common::telemetry::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json)?;
    cli.run().await
}
