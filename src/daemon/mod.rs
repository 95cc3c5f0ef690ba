//! Container daemon access: listing, inspection, and cgroup mount
//! discovery (spec.md §4.1).

pub mod cache;
pub mod client;
pub mod mounts;

pub use cache::Inspection;
pub use client::{short_id, DaemonClient};
