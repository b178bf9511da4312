//! # thinlxc-image
//!
//! Provisioning of the shared read-only base image every container is
//! layered on. The image is fetched once as a gzip tarball, verified
//! against a published SHA-256 digest, and unpacked next to its final path.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod fetch;
pub mod hash;
