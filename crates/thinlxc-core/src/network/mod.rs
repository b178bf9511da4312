//! Host networking for containers.

pub mod forward;
