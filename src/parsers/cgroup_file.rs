//! Shared low-level readers for cgroup pseudo-files (spec.md §4.2 "rules
//! common to cgroup readers"): decimal ASCII with optional trailing
//! whitespace, key/value lines, or whitespace-separated arrays.

use std::io::ErrorKind;
use std::path::Path;

use crate::errors::Result;
use crate::util;

/// Reads a file whose entire content is a single unsigned decimal.
pub fn read_u64(path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)?;
    Ok(util::parse_u64_str(content.trim()).unwrap_or(0))
}

/// Reads a file, treating "not found" as an absent (not erroring)
/// result, for the handful of call sites the spec explicitly permits
/// that leniency (blkio fallback, optional filesystem counters).
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn read_string(path: &Path) -> Result<String> { Ok(std::fs::read_to_string(path)?) }

/// Splits a key/value style file (`cpu.stat`, `cpuacct.stat`,
/// `memory.stat`) into `(key, value)` pairs, one per non-empty line.
pub fn kv_lines(content: &str) -> impl Iterator<Item = (&str, &str)> {
    util::lines(content).filter_map(|line| {
        let mut parts = line.split_whitespace();
        let key = parts.next()?;
        let value = parts.next()?;
        Some((key, value))
    })
}

/// Splits a whitespace-separated array of decimals (`cpuacct.usage_percpu`).
pub fn u64_array(content: &str) -> Vec<u64> {
    content.split_whitespace().filter_map(util::parse_u64_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_lines_splits_pairs() {
        let pairs: Vec<_> = kv_lines("nr_periods 1\nnr_throttled 2\n").collect();
        assert_eq!(pairs, vec![("nr_periods", "1"), ("nr_throttled", "2")]);
    }

    #[test]
    fn u64_array_parses_whitespace_separated_decimals() {
        assert_eq!(u64_array("44444444 555555555\n"), vec![44_444_444, 555_555_555]);
    }

    #[test]
    fn read_optional_treats_missing_file_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(read_optional(&missing).unwrap().is_none());
    }
}
