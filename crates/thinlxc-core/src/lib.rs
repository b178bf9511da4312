//! # thinlxc-core
//!
//! Host-side primitives backing a thin-lxc container.
//!
//! This crate provides:
//! - **Exec**: the [`CommandRunner`](exec::CommandRunner) seam every external
//!   tool invocation goes through.
//! - **Filesystem**: overlay layer management and bind mount preparation.
//! - **Network**: the per-container NAT `PREROUTING` forwarding rule.
//!
//! Mounting, firewalling and process isolation are delegated to external
//! tools; nothing here issues those syscalls directly.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod exec;
pub mod filesystem;
pub mod network;
