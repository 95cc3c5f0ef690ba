//! ZFS dataset accounting (spec.md §4.2.12): `total = used + avail +
//! usedbydataset`; `free`/`available = avail`.

use std::process::Command;

use crate::errors::{CollectorError, Result};
use crate::util;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZfsUsage {
    pub used: u64,
    pub available: u64,
    pub used_by_dataset: u64,
}

impl ZfsUsage {
    #[must_use]
    pub fn total(&self) -> u64 { self.used + self.available + self.used_by_dataset }
}

pub trait Zfs: Send + Sync {
    fn usage(&self, dataset: &str) -> Result<ZfsUsage>;
}

/// Production implementation: `zfs get -Hp used,available,usedbydataset
/// <dataset>`, one tab-separated `name property value source` row per
/// property.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellZfs;

impl Zfs for ShellZfs {
    fn usage(&self, dataset: &str) -> Result<ZfsUsage> {
        let output = Command::new("zfs")
            .args(["get", "-Hp", "used,available,usedbydataset", dataset])
            .output()
            .map_err(|e| CollectorError::Other(e.into()))?;
        if !output.status.success() {
            return Err(CollectorError::UsageUnknown(dataset.into()));
        }
        parse_usage(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| CollectorError::UsageUnknown(dataset.into()))
    }
}

fn parse_usage(raw: &str) -> Option<ZfsUsage> {
    let mut usage = ZfsUsage::default();
    for line in raw.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (property, value) = (*fields.get(1)?, *fields.get(2)?);
        let value = util::parse_u64_str(value)?;
        match property {
            "used" => usage.used = value,
            "available" => usage.available = value,
            "usedbydataset" => usage.used_by_dataset = value,
            _ => {},
        }
    }
    Some(usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_property_rows() {
        let raw = "tank/root\tused\t1000\t-\ntank/root\tavailable\t2000\t-\ntank/root\tusedbydataset\t300\t-\n";
        let usage = parse_usage(raw).unwrap();
        assert_eq!(usage, ZfsUsage { used: 1000, available: 2000, used_by_dataset: 300 });
        assert_eq!(usage.total(), 3300);
    }
}
