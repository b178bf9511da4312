//! `thin-lxc list` — Show every persisted container.

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;

use crate::output;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the containers root cannot be listed.
pub fn execute(args: &ListArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    let missing = thinlxc_core::exec::missing_tools(thinlxc_core::exec::REQUIRED_TOOLS);
    if !missing.is_empty() {
        tracing::warn!(missing = %missing.join(", "), "state and rule checks will read as absent");
    }
    let statuses = super::orchestrator(config)?.list()?;

    if args.json {
        let lines: Vec<_> = statuses.iter().map(output::status_json).collect();
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }
    if statuses.is_empty() {
        println!("No containers found.");
        return Ok(());
    }
    output::print_status_table(&statuses);
    Ok(())
}
