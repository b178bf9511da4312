//! On-disk container metadata.
//!
//! Each container's declared configuration lives in
//! `{containers_root}/{name}/.metadata.json`. The containers root is the
//! registry: any subdirectory holding a readable record is a container.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thinlxc_common::constants::{METADATA_FILE, METADATA_SCHEMA_VERSION};
use thinlxc_common::error::{Result, ThinLxcError};
use thinlxc_common::types::ContainerName;

use crate::container::Container;

#[derive(Serialize)]
struct RecordRef<'a> {
    schema_version: u32,
    #[serde(flatten)]
    container: &'a Container,
}

#[derive(Deserialize)]
struct Record {
    #[serde(default)]
    schema_version: u32,
    #[serde(flatten)]
    container: Container,
}

/// Reads and writes metadata records under a containers root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Containers root this store reads from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `name`.
    #[must_use]
    pub fn record_path(&self, name: &ContainerName) -> PathBuf {
        self.root.join(name.as_str()).join(METADATA_FILE)
    }

    /// Whether a record exists for `name`.
    #[must_use]
    pub fn exists(&self, name: &ContainerName) -> bool {
        self.record_path(name).is_file()
    }

    /// Writes the container's record.
    ///
    /// The record is written to a sibling temporary file and renamed into
    /// place, so a reader never observes a partial record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn persist(&self, container: &Container) -> Result<()> {
        let path = self.record_path(&container.name);
        let tmp = path.with_extension("json.tmp");
        let record = RecordRef {
            schema_version: METADATA_SCHEMA_VERSION,
            container,
        };
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&tmp, json).map_err(|e| ThinLxcError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| ThinLxcError::io(&path, e))?;
        tracing::debug!(container = %container.name, path = %path.display(), "metadata persisted");
        Ok(())
    }

    /// Loads the record for `name`.
    ///
    /// # Errors
    ///
    /// Returns `ThinLxcError::NotFound` if the record is absent or cannot be
    /// parsed; the cause is logged.
    pub fn load(&self, name: &ContainerName) -> Result<Container> {
        let path = self.record_path(name);
        let not_found = || ThinLxcError::NotFound {
            kind: "container metadata",
            id: name.to_string(),
        };

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(container = %name, path = %path.display(), error = %e, "metadata unreadable");
                return Err(not_found());
            }
        };
        let record: Record = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(container = %name, path = %path.display(), error = %e, "metadata unparsable");
                return Err(not_found());
            }
        };
        if record.schema_version > METADATA_SCHEMA_VERSION {
            tracing::warn!(
                container = %name,
                found = record.schema_version,
                supported = METADATA_SCHEMA_VERSION,
                "metadata written by a newer version"
            );
        }
        Ok(record.container)
    }

    /// Names of every container with a record, sorted.
    ///
    /// Subdirectories without a record, or whose name is not a valid
    /// container name, are skipped. A missing root yields no containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists but cannot be listed.
    pub fn enumerate(&self) -> Result<Vec<ContainerName>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ThinLxcError::io(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ThinLxcError::io(&self.root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Ok(name) = ContainerName::new(file_name.to_string_lossy()) else {
                continue;
            };
            if self.exists(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
