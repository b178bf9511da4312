//! External command execution.
//!
//! Every mount, firewall and runtime operation is a synchronous invocation
//! of an administrative tool. The contract with each tool is the same:
//! zero exit is success, anything else is a failure carrying the combined
//! stdout and stderr.

use std::process::Command;

use thinlxc_common::error::{Result, ThinLxcError};

/// Tools thin-lxc expects on the host `PATH`.
pub const REQUIRED_TOOLS: &[&str] = &[
    "mount",
    "umount",
    "iptables",
    "lxc-info",
    "lxc-start",
    "lxc-stop",
];

/// Runs external programs on behalf of the control plane.
///
/// Implementations block until the program exits. No timeout is applied.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, returning its stdout on a zero exit.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::ExternalTool` carrying the combined output on a
    /// non-zero exit, or `ThinLxcError::Io` if the program cannot be spawned.
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Runs programs as host processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        tracing::debug!(program, ?args, "running external command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ThinLxcError::io(program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ThinLxcError::ExternalTool {
            command: command_line(program, args),
            output: format!("{stdout}{stderr}").trim_end().to_string(),
        })
    }
}

/// Formats a program and its arguments for error messages.
#[must_use]
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the subset of `tools` that cannot be found on `PATH`.
#[must_use]
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| (*tool).to_string())
        .collect()
}
