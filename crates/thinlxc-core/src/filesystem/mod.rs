//! Filesystem management for container storage.
//!
//! Provides the overlay pair backing a container's root filesystem and the
//! preparation of bind mount destinations inside it.

pub mod bind;
pub mod overlayfs;
