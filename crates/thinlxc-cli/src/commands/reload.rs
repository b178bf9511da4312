//! `thin-lxc reload` — Restore mounts and forwarding after a reboot.

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;

/// Arguments for the `reload` command.
#[derive(Args, Debug)]
pub struct ReloadArgs {}

/// Executes the `reload` command.
///
/// Every container is attempted; the command fails afterwards if any did.
///
/// # Errors
///
/// Returns an error if the containers root cannot be listed or at least one
/// container failed to reload.
pub fn execute(_args: &ReloadArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    let report = super::orchestrator(config)?.reload()?;

    println!("Reloaded {} container(s)", report.reloaded);
    for (name, error) in &report.failures {
        eprintln!("  {name}: {error}");
    }
    if !report.is_clean() {
        anyhow::bail!("{} container(s) failed to reload", report.failures.len());
    }
    Ok(())
}
