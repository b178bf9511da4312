//! Global configuration model for thin-lxc.
//!
//! Operation parameters are supplied once per invocation and validated
//! before any side effect begins.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, ThinLxcError};

/// Root configuration for thin-lxc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinLxcConfig {
    /// Parent directory of every container root path.
    pub containers_root: PathBuf,
    /// Default shared base image.
    pub base_image: PathBuf,
    /// Tarball fetched when the base image is missing.
    pub base_image_url: Option<String>,
    /// Document holding the tarball's SHA-256 digest.
    pub base_image_sha256_url: Option<String>,
    /// Bridge the runtime attaches container interfaces to.
    pub bridge_link: String,
    /// Private bridge subnet in CIDR notation.
    pub bridge_subnet: String,
    /// Default gateway written into containers.
    pub gateway: Ipv4Addr,
    /// Additional unmount attempts during destroy.
    pub unmount_retries: u32,
    /// Wait between unmount attempts, in milliseconds.
    pub unmount_backoff_ms: u64,
    /// State polling interval, in milliseconds.
    pub poll_interval_ms: u64,
    /// Extra wait after observing the running state, in milliseconds.
    pub settle_delay_ms: u64,
    /// Upper bound on a state wait, in milliseconds. Zero disables the bound.
    pub wait_timeout_ms: u64,
}

impl Default for ThinLxcConfig {
    fn default() -> Self {
        Self {
            containers_root: PathBuf::from(constants::DEFAULT_CONTAINERS_ROOT),
            base_image: PathBuf::from(constants::DEFAULT_BASE_IMAGE),
            base_image_url: None,
            base_image_sha256_url: None,
            bridge_link: constants::DEFAULT_BRIDGE_LINK.to_string(),
            bridge_subnet: constants::DEFAULT_BRIDGE_SUBNET.to_string(),
            gateway: constants::DEFAULT_GATEWAY,
            unmount_retries: 5,
            unmount_backoff_ms: 1000,
            poll_interval_ms: 500,
            settle_delay_ms: 5000,
            wait_timeout_ms: 120_000,
        }
    }
}

impl ThinLxcConfig {
    /// Loads a configuration file, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ThinLxcError::io(path, e))?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Rejects values that would make later operations misbehave.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !self.containers_root.is_absolute() {
            return Err(ThinLxcError::Config {
                message: format!(
                    "containers_root must be absolute, got {}",
                    self.containers_root.display()
                ),
            });
        }
        let _ = parse_cidr(&self.bridge_subnet)?;
        if self.poll_interval_ms == 0 {
            return Err(ThinLxcError::Config {
                message: "poll_interval_ms must be greater than zero".into(),
            });
        }
        if self.base_image_url.is_some() != self.base_image_sha256_url.is_some() {
            return Err(ThinLxcError::Config {
                message: "base_image_url and base_image_sha256_url must be set together".into(),
            });
        }
        Ok(())
    }

    /// Wait between unmount attempts.
    #[must_use]
    pub const fn unmount_backoff(&self) -> Duration {
        Duration::from_millis(self.unmount_backoff_ms)
    }

    /// State polling interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Settle delay applied after observing the running state.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Upper bound on a state wait, `None` when unbounded.
    #[must_use]
    pub const fn wait_timeout(&self) -> Option<Duration> {
        if self.wait_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.wait_timeout_ms))
        }
    }
}

/// Splits `a.b.c.d/len` into its address and prefix length.
///
/// # Errors
///
/// Returns `ThinLxcError::Config` if the notation is malformed.
pub fn parse_cidr(cidr: &str) -> Result<(Ipv4Addr, u8)> {
    let invalid = || ThinLxcError::Config {
        message: format!("invalid IPv4 subnet {cidr:?}"),
    };
    let (addr, len) = cidr.split_once('/').ok_or_else(invalid)?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
    let len: u8 = len.parse().map_err(|_| invalid())?;
    if len > 32 {
        return Err(invalid());
    }
    Ok((addr, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ThinLxcConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn relative_containers_root_is_rejected() {
        let config = ThinLxcConfig {
            containers_root: PathBuf::from("containers"),
            ..ThinLxcConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_subnet_is_rejected() {
        let config = ThinLxcConfig {
            bridge_subnet: "10.0.3.0".into(),
            ..ThinLxcConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(parse_cidr("10.0.3.0/33").is_err());
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let config = ThinLxcConfig {
            wait_timeout_ms: 0,
            ..ThinLxcConfig::default()
        };
        assert_eq!(config.wait_timeout(), None);
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("thin-lxc.json");
        std::fs::write(&path, r#"{ "containers_root": "/srv/containers", "unmount_retries": 2 }"#)
            .expect("write");

        let config = ThinLxcConfig::load(&path).expect("load");
        assert_eq!(config.containers_root, PathBuf::from("/srv/containers"));
        assert_eq!(config.unmount_retries, 2);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.gateway, Ipv4Addr::new(10, 0, 3, 1));
    }
}
