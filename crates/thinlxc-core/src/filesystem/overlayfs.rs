//! `OverlayFS` management for copy-on-write container storage.
//!
//! Stacks the shared read-only base image under a private writable layer.
//! The merged view is mounted on the container's read-only-layer path, and
//! its `rootfs` subdirectory is what the runtime chroots into.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thinlxc_common::constants::ROOTFS_DIR;
use thinlxc_common::error::{Result, ThinLxcError};

use crate::exec::CommandRunner;

/// The directories backing one container's overlay mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLayers {
    /// Container root; everything below is removed by [`cleanup`](Self::cleanup).
    pub root: PathBuf,
    /// Shared read-only base image (overlay lower layer).
    pub lower_dir: PathBuf,
    /// Private writable layer (overlay upper layer).
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Mount point of the merged view.
    pub merged_dir: PathBuf,
}

impl OverlayLayers {
    /// Root filesystem subpath of the merged view.
    #[must_use]
    pub fn rootfs(&self) -> PathBuf {
        self.merged_dir.join(ROOTFS_DIR)
    }

    /// Creates the mount point, writable layer and work directories.
    ///
    /// Succeeds if they already exist. No external process is invoked.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn setup(&self) -> Result<()> {
        for dir in [&self.merged_dir, &self.upper_dir, &self.work_dir] {
            create_private_dir(dir)?;
        }
        tracing::debug!(root = %self.root.display(), "overlay directories ready");
        Ok(())
    }

    /// Mounts the overlay with the base image as the lower layer.
    ///
    /// Must not be called twice without an intervening unmount; callers
    /// check [`is_mounted`](Self::is_mounted) first.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::ExternalTool` carrying the output of `mount`
    /// if it exits non-zero.
    pub fn mount(&self, runner: &dyn CommandRunner) -> Result<()> {
        let opts = format!(
            "lowerdir={},upperdir={},workdir={}",
            self.lower_dir.display(),
            self.upper_dir.display(),
            self.work_dir.display()
        );
        let args = vec![
            "-t".to_string(),
            "overlay".to_string(),
            "-o".to_string(),
            opts,
            "overlay".to_string(),
            self.merged_dir.display().to_string(),
        ];
        let _ = runner.run("mount", &args)?;
        tracing::info!(merged = %self.merged_dir.display(), "overlayfs mounted");
        Ok(())
    }

    /// Unmounts the overlay, retrying on failure.
    ///
    /// Makes `1 + max_retries` attempts with `backoff` between them. Busy
    /// mounts are common right after the runtime is asked to stop the
    /// container, before its processes release their file handles.
    ///
    /// # Errors
    ///
    /// Returns the last `umount` failure once every attempt is exhausted.
    pub fn unmount(
        &self,
        runner: &dyn CommandRunner,
        max_retries: u32,
        backoff: Duration,
    ) -> Result<()> {
        let args = vec![self.merged_dir.display().to_string()];
        let mut attempt = 0;
        loop {
            match runner.run("umount", &args) {
                Ok(_) => {
                    tracing::info!(path = %self.merged_dir.display(), "overlayfs unmounted");
                    return Ok(());
                }
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        path = %self.merged_dir.display(),
                        attempt,
                        max_retries,
                        error = %e,
                        "unmount failed, retrying"
                    );
                    std::thread::sleep(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether the root filesystem subpath exists.
    ///
    /// This is a presence check, not a mount table query, so a directory
    /// created there by anything else also reads as mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.rootfs().exists()
    }

    /// Recursively removes the container root. Only valid after unmount.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails for a reason other than absence.
    pub fn cleanup(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ThinLxcError::io(&self.root, e)),
        }
        tracing::info!(root = %self.root.display(), "container root removed");
        Ok(())
    }
}

/// Creates `dir` and its parents with owner-only permissions.
///
/// # Errors
///
/// Returns `ThinLxcError::Io` if creation fails.
pub fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    let _ = builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        let _ = builder.mode(0o700);
    }
    builder.create(dir).map_err(|e| ThinLxcError::io(dir, e))
}
