//! Subprocess and kernel-call dependencies abstracted behind small
//! traits with deterministic in-memory fakes for tests (spec.md §9
//! "subprocess dependencies"): directory sizing (`du`), devicemapper
//! pool status (`dmsetup`), ZFS dataset accounting, and the
//! statvfs-equivalent kernel call for everything else.

pub mod devicemapper;
pub mod sizer;
pub mod statvfs;
pub mod zfs;

pub use devicemapper::{DmSetup, ShellDmSetup};
pub use sizer::{ShellSizer, Sizer};
pub use zfs::{ShellZfs, Zfs, ZfsUsage};
