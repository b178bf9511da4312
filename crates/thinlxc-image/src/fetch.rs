//! One-shot base image download and extraction.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thinlxc_common::config::ThinLxcConfig;
use thinlxc_common::constants::ROOTFS_DIR;
use thinlxc_common::error::{Result, ThinLxcError};

use crate::hash;

/// Remote location of a base image tarball and its checksum document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    /// URL of the gzip tarball.
    pub url: String,
    /// URL of the SHA-256 checksum document.
    pub sha256_url: String,
}

impl RemoteImage {
    /// Reads the remote location from the configuration, if one is set.
    #[must_use]
    pub fn from_config(config: &ThinLxcConfig) -> Option<Self> {
        Some(Self {
            url: config.base_image_url.clone()?,
            sha256_url: config.base_image_sha256_url.clone()?,
        })
    }
}

/// Whether `base_image` already holds an unpacked root filesystem.
#[must_use]
pub fn is_present(base_image: &Path) -> bool {
    base_image.join(ROOTFS_DIR).is_dir()
}

/// Makes sure the base image exists, fetching it when a remote is configured.
///
/// The tarball is expected to contain the base image directory itself and
/// is unpacked into the base image's parent directory.
///
/// # Errors
///
/// Returns `ThinLxcError::NotFound` if the image is absent and cannot be
/// fetched, or any download, verification or extraction failure.
pub fn ensure_base_image(base_image: &Path, remote: Option<&RemoteImage>) -> Result<()> {
    if is_present(base_image) {
        return Ok(());
    }
    let Some(remote) = remote else {
        return Err(ThinLxcError::NotFound {
            kind: "base image",
            id: base_image.display().to_string(),
        });
    };
    let parent = base_image.parent().unwrap_or_else(|| Path::new("/"));
    std::fs::create_dir_all(parent).map_err(|e| ThinLxcError::io(parent, e))?;

    let archive = archive_path(base_image);
    tracing::info!(url = %remote.url, archive = %archive.display(), "downloading base image");
    download(&remote.url, &archive)?;

    let expected = hash::parse_digest(&fetch_text(&remote.sha256_url)?)?;
    hash::validate_hash(&archive, &expected)?;

    tracing::info!(dest = %parent.display(), "extracting base image");
    extract_tarball(&archive, parent)?;

    if !is_present(base_image) {
        return Err(ThinLxcError::NotFound {
            kind: "base image rootfs after extraction",
            id: base_image.join(ROOTFS_DIR).display().to_string(),
        });
    }
    Ok(())
}

fn archive_path(base_image: &Path) -> PathBuf {
    let name = base_image
        .file_name()
        .map_or_else(|| "base".into(), |n| n.to_string_lossy().into_owned());
    base_image.with_file_name(format!("{name}.tar.gz"))
}

fn download_error(url: &str, e: &reqwest::Error) -> ThinLxcError {
    ThinLxcError::Download {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Streams `url` into the file at `dest`.
///
/// # Errors
///
/// Returns `ThinLxcError::Download` on HTTP failure or `ThinLxcError::Io`
/// if the file cannot be written.
pub fn download(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| download_error(url, &e))?;
    let mut file = File::create(dest).map_err(|e| ThinLxcError::io(dest, e))?;
    let bytes = response
        .copy_to(&mut file)
        .map_err(|e| download_error(url, &e))?;
    tracing::debug!(url, bytes, "download complete");
    Ok(())
}

fn fetch_text(url: &str) -> Result<String> {
    reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text)
        .map_err(|e| download_error(url, &e))
}

/// Unpacks a gzip tarball into `dest`, preserving permissions.
///
/// # Errors
///
/// Returns `ThinLxcError::Io` if the archive cannot be read or unpacked.
pub fn extract_tarball(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| ThinLxcError::io(archive, e))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.set_preserve_permissions(true);
    tarball
        .unpack(dest)
        .map_err(|e| ThinLxcError::io(archive, e))?;
    Ok(())
}
