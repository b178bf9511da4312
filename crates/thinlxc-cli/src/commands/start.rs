//! `thin-lxc start` — Start a container through `lxc-start`.

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::{ContainerName, ContainerState};

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Container to start.
    pub name: ContainerName,

    /// Block until the runtime reports RUNNING and the network settles.
    #[arg(short, long)]
    pub wait: bool,
}

/// Executes the `start` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, `lxc-start` fails, or the
/// wait does not reach RUNNING.
pub fn execute(args: &StartArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    let orchestrator = super::orchestrator(config)?;
    orchestrator.start(&args.name)?;
    if args.wait {
        super::wait::wait_for(orchestrator.monitor(), &args.name, ContainerState::Running)?;
    } else {
        println!("Container {} starting", args.name);
    }
    Ok(())
}
