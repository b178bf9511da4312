//! Bind mount preparation.
//!
//! The runtime performs the bind mounts itself at start; this module makes
//! sure each host source exists and that each destination inside the
//! container's root filesystem is present for the runtime to mount onto.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thinlxc_common::error::{Result, ThinLxcError};

use super::overlayfs::create_private_dir;

/// A bind mount with its destination resolved inside the root filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Host path being exposed.
    pub source: PathBuf,
    /// Absolute host-side path of the destination under the rootfs.
    pub destination: PathBuf,
}

/// Resolves a declared container path against the root filesystem.
///
/// Destinations already under `rootfs` are kept as is; anything else is
/// taken relative to `rootfs`.
#[must_use]
pub fn resolve_destination(rootfs: &Path, declared: &Path) -> PathBuf {
    if declared.starts_with(rootfs) {
        return declared.to_path_buf();
    }
    rootfs.join(declared.strip_prefix("/").unwrap_or(declared))
}

/// Validates every source and materializes every destination.
///
/// A destination whose last component contains a `.` (`app.conf`, `.bashrc`)
/// is created as an empty file, anything else as a directory. Existing
/// destinations are left alone.
///
/// # Errors
///
/// Returns `ThinLxcError::NotFound` for a missing host source, or
/// `ThinLxcError::Io` if a destination cannot be created.
pub fn prepare_bind_mounts(
    rootfs: &Path,
    mounts: &BTreeMap<PathBuf, PathBuf>,
) -> Result<Vec<BindMount>> {
    let mut prepared = Vec::with_capacity(mounts.len());
    for (source, declared) in mounts {
        if !source.exists() {
            return Err(ThinLxcError::NotFound {
                kind: "bind mount source",
                id: source.display().to_string(),
            });
        }
        let destination = resolve_destination(rootfs, declared);
        if !destination.exists() {
            create_destination(&destination)?;
            tracing::debug!(
                source = %source.display(),
                destination = %destination.display(),
                "bind mount destination created"
            );
        }
        prepared.push(BindMount {
            source: source.clone(),
            destination,
        });
    }
    Ok(prepared)
}

/// Whether the last component carries a `.` suffix, dotfiles included.
fn is_file_like(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains('.'))
}

fn create_destination(destination: &Path) -> Result<()> {
    if !is_file_like(destination) {
        return create_private_dir(destination);
    }
    if let Some(parent) = destination.parent() {
        create_private_dir(parent)?;
    }
    let _ = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| ThinLxcError::io(destination, e))?;
    Ok(())
}
