//! `thin-lxc create` — Create a container ready for `lxc-start`.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Args;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::types::{ContainerName, PortMapping, parse_bind_mounts};
use thinlxc_image::fetch::{RemoteImage, ensure_base_image};
use thinlxc_runtime::container::ContainerSpec;

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Unique container name.
    #[arg(short, long)]
    pub name: ContainerName,

    /// Hostname inside the container (defaults to the name).
    #[arg(long)]
    pub hostname: Option<String>,

    /// Static address on the bridge; DHCP when omitted.
    #[arg(long)]
    pub ip: Option<Ipv4Addr>,

    /// Base image directory (defaults to the configured one).
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// TCP forwarding as `hostPort:containerPort`.
    #[arg(short, long)]
    pub port: Option<PortMapping>,

    /// Bind mounts as `hostPath:containerPath[,...]`.
    #[arg(short, long)]
    pub mount: Option<String>,
}

impl CreateArgs {
    fn into_spec(self) -> anyhow::Result<ContainerSpec> {
        let bind_mounts: BTreeMap<PathBuf, PathBuf> = match &self.mount {
            Some(spec) => parse_bind_mounts(spec)?,
            None => BTreeMap::new(),
        };
        Ok(ContainerSpec {
            name: self.name,
            hostname: self.hostname,
            address: self.ip,
            base_image: self.base,
            ports: self.port.unwrap_or_default(),
            bind_mounts,
        })
    }
}

/// Executes the `create` command.
///
/// # Errors
///
/// Returns an error if the base image is unavailable or any creation step
/// fails.
pub fn execute(args: CreateArgs, config: ThinLxcConfig) -> anyhow::Result<()> {
    super::preflight()?;
    let spec = args.into_spec()?;

    let base_image = spec.base_image.clone().unwrap_or_else(|| config.base_image.clone());
    ensure_base_image(&base_image, RemoteImage::from_config(&config).as_ref())?;

    let orchestrator = super::orchestrator(config)?;
    let container = orchestrator.create(spec)?;

    println!("Container {} created at {}", container.name, container.path.display());
    if !container.ports().is_none() {
        println!("Forwarding {}", container.port_forward(&orchestrator.config().bridge_subnet));
    }
    println!("Start it with:");
    println!(
        "  lxc-start -n {} -f {} -d",
        container.name,
        container.config_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Command};

    fn parse(args: &[&str]) -> CreateArgs {
        let cli = Cli::try_parse_from(args).expect("parse");
        let Command::Create(create) = cli.command else {
            panic!("expected create");
        };
        create
    }

    #[test]
    fn full_create_line_becomes_spec() {
        let spec = parse(&[
            "thin-lxc", "create", "--name", "c1", "--ip", "10.0.3.245", "--port", "9999:8888",
            "--mount", "/srv/data:/mnt/data,/srv/app.conf:/etc/app.conf",
        ])
        .into_spec()
        .expect("spec");
        assert_eq!(spec.name.as_str(), "c1");
        assert_eq!(spec.address, Some(Ipv4Addr::new(10, 0, 3, 245)));
        assert_eq!(spec.ports, PortMapping { host: 9999, container: 8888 });
        assert_eq!(spec.bind_mounts.len(), 2);
    }

    #[test]
    fn minimal_create_has_no_ports_or_mounts() {
        let spec = parse(&["thin-lxc", "create", "-n", "c4"]).into_spec().expect("spec");
        assert!(spec.ports.is_none());
        assert!(spec.bind_mounts.is_empty());
        assert_eq!(spec.hostname, None);
    }

    #[test]
    fn invalid_name_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["thin-lxc", "create", "-n", "../etc"]).is_err());
    }
}
