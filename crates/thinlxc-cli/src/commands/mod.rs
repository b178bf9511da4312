//! CLI command definitions and dispatch.

pub mod create;
pub mod destroy;
pub mod list;
pub mod reload;
pub mod start;
pub mod stop;
pub mod wait;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_core::exec::{self, SystemRunner};
use thinlxc_runtime::lifecycle::Orchestrator;

/// thin-lxc — copy-on-write LXC containers over a shared base image.
#[derive(Parser, Debug)]
#[command(name = "thin-lxc", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true, env = "THIN_LXC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Parent directory of every container root (overrides the config file).
    #[arg(long, global = true)]
    pub containers_root: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a container and prepare it for lxc-start.
    Create(create::CreateArgs),
    /// Remove a stopped container, its mounts and its forwarding rule.
    Destroy(destroy::DestroyArgs),
    /// Restore mounts and forwarding rules after a host reboot.
    Reload(reload::ReloadArgs),
    /// Start a container through the runtime.
    Start(start::StartArgs),
    /// Stop a container through the runtime.
    Stop(stop::StopArgs),
    /// Wait until a container reaches a state.
    Wait(wait::WaitArgs),
    /// List containers with their state, mounts and forwarding.
    List(list::ListArgs),
}

impl Cli {
    /// Builds the effective configuration: defaults, then the config file,
    /// then command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or the result is
    /// invalid.
    pub fn load_config(&self) -> anyhow::Result<ThinLxcConfig> {
        let mut config = match &self.config {
            Some(path) => ThinLxcConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ThinLxcConfig::default(),
        };
        if let Some(root) = &self.containers_root {
            config.containers_root.clone_from(root);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Fails if a tool the control plane shells out to is missing from `PATH`.
///
/// # Errors
///
/// Returns an error naming every missing tool.
pub fn preflight() -> anyhow::Result<()> {
    let missing = exec::missing_tools(exec::REQUIRED_TOOLS);
    if !missing.is_empty() {
        anyhow::bail!("required tools not found on PATH: {}", missing.join(", "));
    }
    Ok(())
}

/// Builds an orchestrator that runs host commands.
///
/// # Errors
///
/// Returns an error if the configuration is rejected.
pub fn orchestrator(config: ThinLxcConfig) -> anyhow::Result<Orchestrator> {
    Ok(Orchestrator::new(config, Arc::new(SystemRunner))?)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    match cli.command {
        Command::Create(args) => create::execute(args, config),
        Command::Destroy(args) => destroy::execute(&args, config),
        Command::Reload(args) => reload::execute(&args, config),
        Command::Start(args) => start::execute(&args, config),
        Command::Stop(args) => stop::execute(&args, config),
        Command::Wait(args) => wait::execute(&args, config),
        Command::List(args) => list::execute(&args, config),
    }
}
