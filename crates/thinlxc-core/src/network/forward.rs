//! NAT port forwarding via `iptables`.
//!
//! Each container with a port mapping owns exactly one `PREROUTING` DNAT
//! rule. Both directions check the rule's presence before mutating, so
//! repeated calls never double-apply or fail on nothing to remove.

use std::fmt;
use std::net::Ipv4Addr;

use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_common::types::PortMapping;

use crate::exec::CommandRunner;

/// Port forwarding rule (DNAT) for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForward {
    /// Host and container ports. `0:0` disables forwarding.
    pub ports: PortMapping,
    /// Container's static address.
    pub address: Option<Ipv4Addr>,
    /// Private subnet whose traffic is never forwarded.
    pub exclude_source: String,
}

/// `iptables` rule operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    Check,
    Append,
    Delete,
}

impl RuleAction {
    const fn flag(self) -> &'static str {
        match self {
            Self::Check => "-C",
            Self::Append => "-A",
            Self::Delete => "-D",
        }
    }
}

impl PortForward {
    /// Creates a forwarding rule description.
    #[must_use]
    pub fn new(
        ports: PortMapping,
        address: Option<Ipv4Addr>,
        exclude_source: impl Into<String>,
    ) -> Self {
        Self {
            ports,
            address,
            exclude_source: exclude_source.into(),
        }
    }

    fn destination(&self) -> Option<String> {
        self.address
            .map(|addr| format!("{addr}:{}", self.ports.container))
    }

    fn rule_args(&self, action: RuleAction, destination: &str) -> Vec<String> {
        let host_port = self.ports.host.to_string();
        [
            "-t",
            "nat",
            action.flag(),
            "PREROUTING",
            "-p",
            "tcp",
            "!",
            "-s",
            self.exclude_source.as_str(),
            "--dport",
            host_port.as_str(),
            "-j",
            "DNAT",
            "--to-destination",
            destination,
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
    }

    fn run(&self, runner: &dyn CommandRunner, action: RuleAction) -> Result<()> {
        let destination = self.destination().ok_or_else(|| {
            ThinLxcError::validation(format!("port forwarding {} requires a static address", self.ports))
        })?;
        let _ = runner.run("iptables", &self.rule_args(action, &destination))?;
        Ok(())
    }

    /// Whether the rule is currently installed.
    ///
    /// Queries `iptables` in check mode. A failing check and an absent rule
    /// are indistinguishable here; both read as `false`.
    #[must_use]
    pub fn rule_exists(&self, runner: &dyn CommandRunner) -> bool {
        if self.ports.is_none() {
            return false;
        }
        self.run(runner, RuleAction::Check).is_ok()
    }

    /// Installs the rule. No-op when no forwarding is requested.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::AlreadyExists` if the rule is already present,
    /// `ThinLxcError::Validation` if the container has no static address, or
    /// the `iptables` failure.
    pub fn forward(&self, runner: &dyn CommandRunner) -> Result<()> {
        if self.ports.is_none() {
            return Ok(());
        }
        if self.rule_exists(runner) {
            return Err(ThinLxcError::AlreadyExists {
                kind: "port forwarding rule",
                id: self.to_string(),
            });
        }
        self.run(runner, RuleAction::Append)?;
        tracing::info!(rule = %self, "port forwarding added");
        Ok(())
    }

    /// Removes the rule. No-op when it is not installed.
    ///
    /// # Errors
    ///
    /// Returns the `iptables` failure if deletion fails.
    pub fn unforward(&self, runner: &dyn CommandRunner) -> Result<()> {
        if !self.rule_exists(runner) {
            return Ok(());
        }
        self.run(runner, RuleAction::Delete)?;
        tracing::info!(rule = %self, "port forwarding removed");
        Ok(())
    }
}

impl fmt::Display for PortForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.destination() {
            Some(dest) => write!(f, "tcp:{} -> {dest}", self.ports.host),
            None => write!(f, "tcp:{} -> (dynamic):{}", self.ports.host, self.ports.container),
        }
    }
}
