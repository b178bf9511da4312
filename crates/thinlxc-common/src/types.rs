//! Domain primitive types used across the thin-lxc workspace.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{HWADDR_PREFIX, MAX_NAME_LEN};
use crate::error::{Result, ThinLxcError};

/// Unique container name, also the external runtime's handle.
///
/// Deserialization runs the same validation as [`ContainerName::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerName(String);

impl ContainerName {
    /// Validates and wraps a container name.
    ///
    /// Names become directory names and runtime handles, so they are limited
    /// to ASCII alphanumerics, `-`, `_` and `.`, must not start with `.`,
    /// and are at most [`MAX_NAME_LEN`] characters long.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Validation` if the name is malformed.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ThinLxcError::validation("container name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ThinLxcError::validation(format!(
                "container name {name:?} exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if name.starts_with('.') {
            return Err(ThinLxcError::validation(format!(
                "container name {name:?} must not start with '.'"
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ThinLxcError::validation(format!(
                "container name {name:?} contains invalid character {bad:?}"
            )));
        }
        Ok(Self(name))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContainerName {
    type Err = ThinLxcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContainerName {
    type Error = ThinLxcError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContainerName> for String {
    fn from(name: ContainerName) -> Self {
        name.0
    }
}

/// Container state as reported by the external runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerState {
    /// The runtime is bringing the container up.
    Starting,
    /// The container's init process is running.
    Running,
    /// The runtime is shutting the container down.
    Stopping,
    /// The container is not running.
    Stopped,
    /// The state could not be determined.
    Unknown,
}

impl ContainerState {
    /// Maps a runtime state word onto a state, degrading to `Unknown`.
    #[must_use]
    pub fn from_runtime(word: &str) -> Self {
        match word.trim().to_ascii_uppercase().as_str() {
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Returns the runtime's spelling of this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerState {
    type Err = ThinLxcError;

    /// Parses a user-supplied target state. `UNKNOWN` is not a valid target.
    fn from_str(s: &str) -> Result<Self> {
        match Self::from_runtime(s) {
            Self::Unknown => Err(ThinLxcError::validation(format!(
                "unknown container state {s:?} (expected starting, running, stopping or stopped)"
            ))),
            state => Ok(state),
        }
    }
}

/// Ethernet hardware address of a container's veth interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HwAddr(String);

impl HwAddr {
    /// Generates an address with a random 3-octet suffix under the vendor prefix.
    #[must_use]
    pub fn random() -> Self {
        let suffix: [u8; 3] = rand::random();
        Self::from_octets(HWADDR_PREFIX, suffix)
    }

    fn from_octets(prefix: [u8; 3], suffix: [u8; 3]) -> Self {
        let octets = prefix
            .iter()
            .chain(suffix.iter())
            .map(|o| format!("{o:02x}"))
            .collect::<Vec<_>>()
            .join(":");
        Self(octets)
    }

    /// Returns the colon-separated hex representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-to-container TCP port mapping. `0:0` means no forwarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortMapping {
    /// Port on the host.
    pub host: u16,
    /// Port inside the container.
    pub container: u16,
}

impl PortMapping {
    /// Whether the mapping requests no forwarding.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.host == 0 && self.container == 0
    }

    /// Checks that both ports are zero or both are non-zero.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Validation` on a half-specified mapping.
    pub fn validate(self) -> Result<()> {
        if (self.host == 0) != (self.container == 0) {
            return Err(ThinLxcError::validation(format!(
                "port mapping {self} must have both ports set or both zero"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

impl FromStr for PortMapping {
    type Err = ThinLxcError;

    /// Parses `hostPort:containerPort`. An empty string yields no forwarding.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let invalid = || ThinLxcError::validation(format!("invalid port mapping {s:?}"));
        let (host, container) = s.split_once(':').ok_or_else(invalid)?;
        let mapping = Self {
            host: host.trim().parse().map_err(|_| invalid())?,
            container: container.trim().parse().map_err(|_| invalid())?,
        };
        mapping.validate()?;
        Ok(mapping)
    }
}

/// Parses `hostPath:containerPath[,...]` into a host-keyed mapping.
///
/// # Errors
///
/// Returns `ThinLxcError::Validation` on a malformed pair or a repeated host path.
pub fn parse_bind_mounts(spec: &str) -> Result<BTreeMap<PathBuf, PathBuf>> {
    let mut mounts = BTreeMap::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (host, container) = pair
            .split_once(':')
            .filter(|(h, c)| !h.is_empty() && !c.is_empty())
            .ok_or_else(|| ThinLxcError::validation(format!("invalid bind mount {pair:?}")))?;
        if mounts
            .insert(PathBuf::from(host), PathBuf::from(container))
            .is_some()
        {
            return Err(ThinLxcError::validation(format!(
                "host path {host:?} is bind mounted twice"
            )));
        }
    }
    Ok(mounts)
}
