//! System-wide constants and default paths.

use std::net::Ipv4Addr;

/// Parent directory of every container root path.
pub const DEFAULT_CONTAINERS_ROOT: &str = "/containers";

/// Default location of the shared base image.
pub const DEFAULT_BASE_IMAGE: &str = "/var/lib/lxc/baseCN";

/// Bridge the runtime attaches container veth pairs to.
pub const DEFAULT_BRIDGE_LINK: &str = "lxcbr0";

/// Private subnet served by the bridge.
pub const DEFAULT_BRIDGE_SUBNET: &str = "10.0.3.0/24";

/// Gateway address on the bridge.
pub const DEFAULT_GATEWAY: Ipv4Addr = Ipv4Addr::new(10, 0, 3, 1);

/// Name of the persisted metadata record inside a container root.
pub const METADATA_FILE: &str = ".metadata.json";

/// Name of the writable (upper) layer directory inside a container root.
pub const WRITABLE_LAYER_DIR: &str = ".wlayer";

/// Name of the overlay work directory inside a container root.
pub const WORK_LAYER_DIR: &str = ".work";

/// Subdirectory of the merged view used as the runtime's root filesystem.
pub const ROOTFS_DIR: &str = "rootfs";

/// Rendered runtime configuration file name inside the merged view.
pub const RUNTIME_CONFIG_FILE: &str = "config";

/// Fstab file name inside the merged view.
pub const FSTAB_FILE: &str = "fstab";

/// Vendor prefix of generated hardware addresses.
pub const HWADDR_PREFIX: [u8; 3] = [0x00, 0x16, 0x3e];

/// Prefix length of the network derived from a static address.
pub const STATIC_PREFIX_LEN: u8 = 24;

/// Current schema version of the metadata record.
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Maximum length of a container name.
pub const MAX_NAME_LEN: usize = 64;
