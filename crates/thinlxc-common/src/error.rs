//! Unified error types for the thin-lxc workspace.
//!
//! Every library crate returns [`ThinLxcError`]; only the CLI decides
//! whether a failure terminates the process.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ThinLxcError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path (or program) where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// User-supplied container parameters were rejected.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// The operation conflicts with the container's current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// An external command exited with a non-zero status.
    #[error("{command} failed: {output}")]
    ExternalTool {
        /// Command line that was executed.
        command: String,
        /// Combined stdout and stderr of the command.
        output: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A resource that must be unique is already present.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Type of the duplicated resource.
        kind: &'static str,
        /// Identifier of the duplicated resource.
        id: String,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// A remote download failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// URL being fetched.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// A runtime configuration template could not be rendered.
    #[error("failed to render {template}: {message}")]
    Render {
        /// Template name.
        template: String,
        /// Description of the rendering failure.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl ThinLxcError {
    /// Builds an [`ThinLxcError::Io`] from a path and an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`ThinLxcError::Validation`] from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ThinLxcError>;
