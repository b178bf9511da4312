//! Formatted output helpers for CLI commands.

use std::net::Ipv4Addr;

use thinlxc_common::types::PortMapping;
use thinlxc_runtime::lifecycle::ContainerStatus;

/// Address column: the static address, or `dhcp`.
#[must_use]
pub fn format_address(address: Option<Ipv4Addr>) -> String {
    address.map_or_else(|| "dhcp".to_string(), |a| a.to_string())
}

/// Ports column: `host->container`, or `-` without forwarding.
#[must_use]
pub fn format_ports(ports: PortMapping, forwarded: bool) -> String {
    if ports.is_none() {
        return "-".to_string();
    }
    let marker = if forwarded { "" } else { " (missing)" };
    format!("{}->{}{marker}", ports.host, ports.container)
}

/// Prints a table of container statuses.
pub fn print_status_table(statuses: &[ContainerStatus]) {
    println!(
        "{:<20} {:<10} {:<8} {:<16} {:<22}",
        "NAME", "STATE", "MOUNTED", "ADDRESS", "PORTS"
    );
    for s in statuses {
        println!(
            "{:<20} {:<10} {:<8} {:<16} {:<22}",
            s.container.name,
            s.state,
            if s.mounted { "yes" } else { "no" },
            format_address(s.container.address),
            format_ports(s.container.ports(), s.forwarded)
        );
    }
}

/// JSON form of one status line.
#[must_use]
pub fn status_json(s: &ContainerStatus) -> serde_json::Value {
    serde_json::json!({
        "name": s.container.name,
        "state": s.state,
        "mounted": s.mounted,
        "forwarded": s.forwarded,
        "address": s.container.address,
        "host_port": s.container.host_port,
        "container_port": s.container.container_port,
        "path": s.container.path,
        "created_at": s.container.created_at,
    })
}
