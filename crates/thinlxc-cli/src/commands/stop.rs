//! `thin-lxc stop` — Stop a container through `lxc-stop`.

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::{ContainerName, ContainerState};

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container to stop.
    pub name: ContainerName,

    /// Block until the runtime reports STOPPED.
    #[arg(short, long)]
    pub wait: bool,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the container is unknown, `lxc-stop` fails, or the
/// wait does not reach STOPPED.
pub fn execute(args: &StopArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    let orchestrator = super::orchestrator(config)?;
    orchestrator.stop(&args.name)?;
    if args.wait {
        super::wait::wait_for(orchestrator.monitor(), &args.name, ContainerState::Stopped)?;
    } else {
        println!("Container {} stopping", args.name);
    }
    Ok(())
}
