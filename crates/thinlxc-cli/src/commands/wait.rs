//! `thin-lxc wait` — Block until a container reaches a state.

use std::time::Duration;

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::{ContainerName, ContainerState};
use thinlxc_runtime::monitor::{MonitorOptions, StateMonitor, WaitOutcome};

/// Arguments for the `wait` command.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Container to watch.
    pub name: ContainerName,

    /// Target state: starting, running, stopping or stopped.
    pub state: ContainerState,

    /// Give up after this many milliseconds; 0 waits until Ctrl+C.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Executes the `wait` command.
///
/// # Errors
///
/// Returns an error if the wait times out or is interrupted.
pub fn execute(args: &WaitArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    let orchestrator = super::orchestrator(config)?;
    let mut options = orchestrator.monitor().options();
    if let Some(ms) = args.timeout_ms {
        options.timeout = timeout_from_ms(ms);
    }
    let monitor = StateMonitor::new(orchestrator.lxc(), options);
    wait_for(&monitor, &args.name, args.state)
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Watches `name` until it reaches `target`; Ctrl+C cancels the watch.
///
/// # Errors
///
/// Returns an error on timeout, cancellation, or if the runtime or signal
/// handler cannot be set up.
pub fn wait_for(
    monitor: &StateMonitor,
    name: &ContainerName,
    target: ContainerState,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let options: MonitorOptions = monitor.options();
    eprintln!("Waiting for {name} to reach {target}...");

    let outcome = runtime.block_on(async {
        let handle = monitor.watch(name.clone(), target);
        let token = handle.cancellation_token();
        ctrlc::set_handler(move || token.cancel())?;
        anyhow::Ok(handle.outcome().await)
    })?;

    match outcome {
        WaitOutcome::Reached(state) => {
            println!("Container {name} is {state}");
            Ok(())
        }
        WaitOutcome::TimedOut => anyhow::bail!(
            "timed out after {:?} waiting for {name} to reach {target}",
            options.timeout.unwrap_or_default()
        ),
        WaitOutcome::Cancelled => anyhow::bail!("wait for {name} interrupted"),
    }
}
