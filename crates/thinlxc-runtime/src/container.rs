//! The container entity and its derived paths.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::constants::{
    FSTAB_FILE, ROOTFS_DIR, RUNTIME_CONFIG_FILE, STATIC_PREFIX_LEN, WORK_LAYER_DIR,
    WRITABLE_LAYER_DIR,
};
use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_common::types::{ContainerName, HwAddr, PortMapping};
use thinlxc_core::filesystem::overlayfs::OverlayLayers;
use thinlxc_core::network::forward::PortForward;

/// User-supplied parameters for a new container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Unique container name.
    pub name: ContainerName,
    /// Hostname; defaults to the name.
    pub hostname: Option<String>,
    /// Static address; `None` selects DHCP.
    pub address: Option<Ipv4Addr>,
    /// Base image; defaults to the configured one.
    pub base_image: Option<PathBuf>,
    /// TCP port forwarding.
    pub ports: PortMapping,
    /// Host path to container path.
    pub bind_mounts: BTreeMap<PathBuf, PathBuf>,
}

impl ContainerSpec {
    /// Creates a spec with every optional parameter unset.
    #[must_use]
    pub const fn new(name: ContainerName) -> Self {
        Self {
            name,
            hostname: None,
            address: None,
            base_image: None,
            ports: PortMapping {
                host: 0,
                container: 0,
            },
            bind_mounts: BTreeMap::new(),
        }
    }
}

/// A container's declared configuration, persisted verbatim as metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique name and runtime handle.
    pub name: ContainerName,
    /// Shared read-only base image.
    pub base_image: PathBuf,
    /// Container root: `{containers_root}/{name}`.
    pub path: PathBuf,
    /// Mount point presenting base plus writes merged.
    pub ro_layer: PathBuf,
    /// Private delta storage.
    pub wr_layer: PathBuf,
    /// Overlay work directory. Absent in records written before it existed.
    #[serde(default)]
    pub work_layer: Option<PathBuf>,
    /// Root filesystem the runtime chroots into.
    pub rootfs: PathBuf,
    /// Rendered runtime configuration.
    pub config_path: PathBuf,
    /// Hostname inside the container.
    pub hostname: String,
    /// Static address; `None` means DHCP.
    pub address: Option<Ipv4Addr>,
    /// Hardware address of the container's interface.
    pub hwaddr: HwAddr,
    /// Forwarded host port, 0 when unset.
    pub host_port: u16,
    /// Target container port, 0 when unset.
    pub container_port: u16,
    /// Host path to container path.
    #[serde(default)]
    pub bind_mounts: BTreeMap<PathBuf, PathBuf>,
    /// RFC 3339 creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

impl Container {
    /// Builds a new container from user parameters.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Validation` if a container with the same name
    /// already exists on disk, the port mapping is half-specified, or ports
    /// are requested without a static address.
    pub fn new(config: &ThinLxcConfig, spec: ContainerSpec) -> Result<Self> {
        spec.ports.validate()?;
        if !spec.ports.is_none() && spec.address.is_none() {
            return Err(ThinLxcError::validation(format!(
                "port mapping {} requires a static address",
                spec.ports
            )));
        }

        let path = config.containers_root.join(spec.name.as_str());
        if path.exists() {
            return Err(ThinLxcError::validation(format!(
                "container {} already exists at {}",
                spec.name,
                path.display()
            )));
        }

        let ro_layer = path.join(spec.name.as_str());
        Ok(Self {
            hostname: spec
                .hostname
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| spec.name.to_string()),
            base_image: spec.base_image.unwrap_or_else(|| config.base_image.clone()),
            wr_layer: path.join(WRITABLE_LAYER_DIR),
            work_layer: Some(path.join(WORK_LAYER_DIR)),
            rootfs: ro_layer.join(ROOTFS_DIR),
            config_path: ro_layer.join(RUNTIME_CONFIG_FILE),
            ro_layer,
            path,
            name: spec.name,
            address: spec.address,
            hwaddr: HwAddr::random(),
            host_port: spec.ports.host,
            container_port: spec.ports.container,
            bind_mounts: spec.bind_mounts,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Port mapping declared for this container.
    #[must_use]
    pub const fn ports(&self) -> PortMapping {
        PortMapping {
            host: self.host_port,
            container: self.container_port,
        }
    }

    /// Whether the container uses a static address.
    #[must_use]
    pub const fn has_static_ip(&self) -> bool {
        self.address.is_some()
    }

    /// Static address with its derived prefix, e.g. `10.0.3.245/24`.
    #[must_use]
    pub fn ip_config(&self) -> Option<String> {
        self.address.map(|a| format!("{a}/{STATIC_PREFIX_LEN}"))
    }

    /// Address method written to the container's interfaces file.
    #[must_use]
    pub const fn inet(&self) -> &'static str {
        if self.has_static_ip() { "manual" } else { "dhcp" }
    }

    /// Fstab referenced by the runtime configuration.
    #[must_use]
    pub fn fstab_path(&self) -> PathBuf {
        self.ro_layer.join(FSTAB_FILE)
    }

    /// Overlay work directory, derived for records that predate it.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_layer
            .clone()
            .unwrap_or_else(|| self.path.join(WORK_LAYER_DIR))
    }

    /// Overlay layers backing this container.
    #[must_use]
    pub fn layers(&self) -> OverlayLayers {
        OverlayLayers {
            root: self.path.clone(),
            lower_dir: self.base_image.clone(),
            upper_dir: self.wr_layer.clone(),
            work_dir: self.work_dir(),
            merged_dir: self.ro_layer.clone(),
        }
    }

    /// Forwarding rule for this container, excluding `bridge_subnet` sources.
    #[must_use]
    pub fn port_forward(&self, bridge_subnet: &str) -> PortForward {
        PortForward::new(self.ports(), self.address, bridge_subnet)
    }

    /// Rootfs-relative path of a file inside the container.
    #[must_use]
    pub fn rootfs_file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.rootfs.join(relative)
    }
}
