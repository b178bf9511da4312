//! `thin-lxc destroy` — Remove a stopped container.

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::ContainerName;

/// Arguments for the `destroy` command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Container to destroy.
    pub name: ContainerName,
}

/// Executes the `destroy` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, still running, or a
/// teardown step fails.
pub fn execute(args: &DestroyArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    super::orchestrator(config)?.destroy(&args.name)?;
    println!("Container {} destroyed", args.name);
    Ok(())
}
