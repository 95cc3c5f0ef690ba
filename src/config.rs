//! Recognized configuration options (spec.md §2) and the process-wide
//! daemon-version record read by the filesystem parser.

use std::sync::atomic::{AtomicU32, Ordering};

pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_PROCFS: &str = "/proc";

/// Resolved configuration for a collector instance. `endpoint` and
/// `procfs` are the only two recognized options (spec.md §2/§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: String,
    pub procfs: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            procfs: DEFAULT_PROCFS.to_owned(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new(endpoint: Option<String>, procfs: Option<String>) -> Self {
        Self {
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            procfs: procfs.unwrap_or_else(|| DEFAULT_PROCFS.to_owned()),
        }
    }
}

/// Daemon major/minor version, detected once at first connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonVersion {
    pub major: u32,
    pub minor: u32,
}

impl DaemonVersion {
    pub const UNKNOWN: Self = Self { major: 0, minor: 0 };

    /// Parses a daemon-reported version string such as `"20.10.7"`,
    /// keeping only the two leading dot-separated integers. An
    /// unparsable or missing version is treated as `(0, 0)` per spec.md
    /// §4.1.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok());
        let minor = parts.next().and_then(|p| p.parse().ok());
        match (major, minor) {
            (Some(major), Some(minor)) => Self { major, minor },
            _ => Self::UNKNOWN,
        }
    }

    /// Whether this version is at least `(major, minor)`, used by the
    /// filesystem parser to decide whether to read the layer-id mount
    /// file (spec.md §4.2.12).
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// Process-wide, lazily-initialized holder for the detected daemon
/// version, read by the filesystem parser (spec.md §2).
#[derive(Debug, Default)]
pub struct VersionCell {
    major: AtomicU32,
    minor: AtomicU32,
    set: std::sync::atomic::AtomicBool,
}

impl VersionCell {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            major: AtomicU32::new(0),
            minor: AtomicU32::new(0),
            set: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set(&self, version: DaemonVersion) {
        self.major.store(version.major, Ordering::SeqCst);
        self.minor.store(version.minor, Ordering::SeqCst);
        self.set.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> DaemonVersion {
        if !self.set.load(Ordering::SeqCst) {
            return DaemonVersion::UNKNOWN;
        }
        DaemonVersion {
            major: self.major.load(Ordering::SeqCst),
            minor: self.minor.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_major_minor() {
        assert_eq!(DaemonVersion::parse("20.10.7"), DaemonVersion { major: 20, minor: 10 });
        assert_eq!(DaemonVersion::parse("1.9"), DaemonVersion { major: 1, minor: 9 });
    }

    #[test]
    fn unparsable_version_is_zero() {
        assert_eq!(DaemonVersion::parse(""), DaemonVersion::UNKNOWN);
        assert_eq!(DaemonVersion::parse("dev"), DaemonVersion::UNKNOWN);
    }

    #[test]
    fn at_least_compares_lexicographically() {
        let v = DaemonVersion { major: 1, minor: 10 };
        assert!(v.at_least(1, 10));
        assert!(v.at_least(1, 9));
        assert!(!v.at_least(1, 11));
        assert!(!v.at_least(2, 0));
    }

    #[test]
    fn version_cell_defaults_unknown() {
        let cell = VersionCell::new();
        assert_eq!(cell.get(), DaemonVersion::UNKNOWN);
        cell.set(DaemonVersion { major: 1, minor: 10 });
        assert_eq!(cell.get(), DaemonVersion { major: 1, minor: 10 });
    }
}
