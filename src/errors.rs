//! Error kinds named in spec.md §7, modeled as a single `thiserror`-derived
//! enum rather than one type per subsystem — the propagation policy
//! (parser errors logged and swallowed; name-resolution/client errors
//! abort the batch) is the same regardless of which layer raised them, so
//! callers only ever need to match on this one type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("container id {0:?} is too short (ids must be at least 12 characters, or \"root\")")]
    IdTooShort(String),

    #[error("unknown container {0:?}")]
    UnknownContainer(String),

    #[error("could not find mount point for cgroup controller {controller:?} in {path:?}")]
    MountNotFound { controller: String, path: PathBuf },

    #[error("bad option {key:?}: {reason}")]
    BadOption { key: String, reason: String },

    #[error("unknown field {0:?} in cgroup accounting file")]
    UnknownField(String),

    #[error("malformed blkio line: {0:?}")]
    BadBlkioLine(String),

    #[error("unrecognized tcp connection state {0:?}")]
    BadTcpState(String),

    #[error("unsupported storage driver {0:?}")]
    UnsupportedDriver(String),

    #[error("directory usage for {0:?} is not yet known")]
    UsageUnknown(PathBuf),

    #[error("unknown dynamic name segment preceding '*' under {0:?}")]
    UnknownDynamicElement(String),

    #[error("metric {name:?} resolves to an unknown dynamic value: {reason}")]
    UnknownDynamicValue { name: String, reason: String },

    #[error("metric {0:?} does not route to any known query group")]
    UnroutedMetric(String),

    #[error("container daemon is unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("daemon is missing requested parameter {0:?}")]
    MissingDaemonInfo(String),

    #[error("batch resolved to zero metric values")]
    NoMetrics,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CollectorError>;
