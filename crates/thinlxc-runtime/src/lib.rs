//! Container lifecycle management for thin-lxc.
//!
//! [`Orchestrator`](lifecycle::Orchestrator) composes the overlay, bind
//! mount and port forwarding primitives from `thinlxc-core` with config
//! rendering and the on-disk [`MetadataStore`](metadata::MetadataStore) into
//! `create`, `destroy` and `reload`. [`StateMonitor`](monitor::StateMonitor)
//! waits for the external runtime to report a target state.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod lifecycle;
pub mod lxc;
pub mod metadata;
pub mod monitor;
pub mod render;
