//! Client for the external LXC runtime tools.

use std::sync::Arc;

use thinlxc_common::error::Result;
use thinlxc_common::types::{ContainerName, ContainerState};
use thinlxc_core::exec::CommandRunner;

use crate::container::Container;

/// Queries and drives containers through `lxc-info`, `lxc-start` and
/// `lxc-stop`.
#[derive(Clone)]
pub struct LxcClient {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for LxcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LxcClient").finish_non_exhaustive()
    }
}

impl LxcClient {
    /// Creates a client issuing commands through `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Current runtime state of `name`.
    ///
    /// Never fails: a failed query or an unrecognized report reads as
    /// [`ContainerState::Unknown`].
    #[must_use]
    pub fn state(&self, name: &ContainerName) -> ContainerState {
        let args = vec!["-n".to_string(), name.to_string()];
        match self.runner.run("lxc-info", &args) {
            Ok(output) => parse_info_state(&output),
            Err(e) => {
                tracing::warn!(container = %name, error = %e, "state query failed");
                ContainerState::Unknown
            }
        }
    }

    /// Starts the container detached, using its rendered configuration.
    ///
    /// # Errors
    ///
    /// Returns the `lxc-start` failure.
    pub fn start(&self, container: &Container) -> Result<()> {
        let args = vec![
            "-n".to_string(),
            container.name.to_string(),
            "-f".to_string(),
            container.config_path.display().to_string(),
            "-d".to_string(),
        ];
        let _ = self.runner.run("lxc-start", &args)?;
        tracing::info!(container = %container.name, "start requested");
        Ok(())
    }

    /// Asks the runtime to stop the container.
    ///
    /// # Errors
    ///
    /// Returns the `lxc-stop` failure.
    pub fn stop(&self, name: &ContainerName) -> Result<()> {
        let _ = self.runner.run("lxc-stop", &["-n".to_string(), name.to_string()])?;
        tracing::info!(container = %name, "stop requested");
        Ok(())
    }
}

/// Extracts the state from `lxc-info` output.
///
/// Only the first line is read, in the form `State:  RUNNING`.
#[must_use]
pub fn parse_info_state(output: &str) -> ContainerState {
    output
        .lines()
        .next()
        .and_then(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("state"))
        .map_or(ContainerState::Unknown, |(_, value)| {
            ContainerState::from_runtime(value.trim())
        })
}
