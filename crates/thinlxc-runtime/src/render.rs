//! Runtime configuration rendering.
//!
//! Writes the LXC configuration consumed by `lxc-start -f` plus the files
//! the guest reads at boot: network interfaces, hosts, hostname and the
//! gateway init script.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_core::filesystem::bind::BindMount;
use thinlxc_core::filesystem::overlayfs::create_private_dir;

use crate::container::Container;

const RUNTIME_CONFIG: &str = "\
lxc.net.0.type = veth
lxc.net.0.link = {{ link }}
lxc.net.0.flags = up
lxc.net.0.hwaddr = {{ hwaddr }}
{%- if ip_config %}
lxc.net.0.ipv4.address = {{ ip_config }}
{%- endif %}
lxc.uts.name = {{ hostname }}

lxc.tty.dir = lxc
lxc.tty.max = 4
lxc.pty.max = 1024
lxc.rootfs.path = {{ rootfs }}
lxc.mount.fstab = {{ fstab }}
lxc.arch = amd64
lxc.cap.drop = sys_module mac_admin

lxc.cgroup.devices.deny = a
lxc.cgroup.devices.allow = c *:* m
lxc.cgroup.devices.allow = b *:* m
lxc.cgroup.devices.allow = c 1:3 rwm
lxc.cgroup.devices.allow = c 1:5 rwm
lxc.cgroup.devices.allow = c 5:1 rwm
lxc.cgroup.devices.allow = c 5:0 rwm
lxc.cgroup.devices.allow = c 1:9 rwm
lxc.cgroup.devices.allow = c 1:8 rwm
lxc.cgroup.devices.allow = c 136:* rwm
lxc.cgroup.devices.allow = c 5:2 rwm
lxc.cgroup.devices.allow = c 254:0 rwm
lxc.cgroup.devices.allow = c 10:229 rwm
lxc.cgroup.devices.allow = c 10:200 rwm
lxc.cgroup.devices.allow = c 1:7 rwm
lxc.cgroup.devices.allow = c 10:228 rwm
lxc.cgroup.devices.allow = c 10:232 rwm
{% for mount in bind_mounts %}
lxc.mount.entry = {{ mount.source }} {{ mount.destination }} none bind,rw 0 0
{%- endfor %}
";

const INTERFACES: &str = "\
auto lo
iface lo inet loopback
auto eth0
iface eth0 inet {{ inet }}
";

const HOSTS: &str = "127.0.0.1 localhost {{ hostname }}\n";

const HOSTNAME: &str = "{{ hostname }}\n";

const SETUP_GATEWAY: &str = "\
description \"setup gateway\"
start on startup
script
route add -net default gw {{ gateway }}
end script
";

const TEMPLATES: &[(&str, &str)] = &[
    ("config", RUNTIME_CONFIG),
    ("interfaces", INTERFACES),
    ("hosts", HOSTS),
    ("hostname", HOSTNAME),
    ("setup-gateway.conf", SETUP_GATEWAY),
];

/// `lxc.mount.entry` source and rootfs-relative destination.
#[derive(Debug, Serialize)]
struct MountEntry {
    source: String,
    destination: String,
}

impl MountEntry {
    fn new(mount: &BindMount, rootfs: &Path) -> Self {
        let destination = mount
            .destination
            .strip_prefix(rootfs)
            .unwrap_or(&mount.destination);
        Self {
            source: mount.source.display().to_string(),
            destination: destination.display().to_string(),
        }
    }
}

/// Renders the per-container configuration files.
#[derive(Debug)]
pub struct ConfigRenderer {
    tera: Tera,
}

impl ConfigRenderer {
    /// Loads the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Render` if a template fails to parse.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        for (name, content) in TEMPLATES {
            tera.add_raw_template(name, content)
                .map_err(|e| render_error(name, &e))?;
        }
        tracing::debug!(templates = TEMPLATES.len(), "config templates loaded");
        Ok(Self { tera })
    }

    /// Writes every configuration file for `container`.
    ///
    /// Existing files are overwritten, except the fstab, which is only
    /// created when missing.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Render` on a template failure or
    /// `ThinLxcError::Io` if a file cannot be written.
    pub fn render_all(
        &self,
        container: &Container,
        bind_mounts: &[BindMount],
        config: &ThinLxcConfig,
    ) -> Result<()> {
        let context = Self::context(container, bind_mounts, config);
        for (template, path) in Self::targets(container) {
            let rendered = self
                .tera
                .render(template, &context)
                .map_err(|e| render_error(template, &e))?;
            write_file(&path, &rendered)?;
        }

        let fstab = container.fstab_path();
        if !fstab.exists() {
            write_file(&fstab, "")?;
        }
        tracing::info!(
            container = %container.name,
            config = %container.config_path.display(),
            "runtime configuration rendered"
        );
        Ok(())
    }

    fn targets(container: &Container) -> [(&'static str, PathBuf); 5] {
        [
            ("config", container.config_path.clone()),
            ("interfaces", container.rootfs_file("etc/network/interfaces")),
            ("hosts", container.rootfs_file("etc/hosts")),
            ("hostname", container.rootfs_file("etc/hostname")),
            ("setup-gateway.conf", container.rootfs_file("etc/init/setup-gateway.conf")),
        ]
    }

    fn context(
        container: &Container,
        bind_mounts: &[BindMount],
        config: &ThinLxcConfig,
    ) -> Context {
        let mounts: Vec<MountEntry> = bind_mounts
            .iter()
            .map(|m| MountEntry::new(m, &container.rootfs))
            .collect();
        let mut context = Context::new();
        context.insert("link", &config.bridge_link);
        context.insert("gateway", &config.gateway.to_string());
        context.insert("hwaddr", container.hwaddr.as_str());
        context.insert("hostname", &container.hostname);
        context.insert("ip_config", &container.ip_config());
        context.insert("inet", container.inet());
        context.insert("rootfs", &container.rootfs.display().to_string());
        context.insert("fstab", &container.fstab_path().display().to_string());
        context.insert("bind_mounts", &mounts);
        context
    }
}

fn render_error(template: &str, e: &tera::Error) -> ThinLxcError {
    ThinLxcError::Render {
        template: template.to_string(),
        message: e.to_string(),
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_private_dir(parent)?;
    }
    std::fs::write(path, content).map_err(|e| ThinLxcError::io(path, e))
}
