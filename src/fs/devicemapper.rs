//! Devicemapper pool status (spec.md §4.2.12, §6): `dmsetup status
//! <pool>`; after replacing `/` with space, fields 6 and 7 are
//! used/total blocks. The data block size itself (also in 512-byte
//! sectors) comes from the thin-pool target line `dmsetup table
//! <pool>` reports: `<start> <len> thin-pool <metadata dev> <data dev>
//! <data_block_size> <low_water_mark> ...`, field index 5.

use std::process::Command;

use crate::errors::{CollectorError, Result};
use crate::util;

pub const BLOCK_SIZE_BYTES: u64 = 512;

pub trait DmSetup: Send + Sync {
    /// Returns (used_blocks, total_blocks) for `pool`.
    fn status(&self, pool: &str) -> Result<(u64, u64)>;

    /// Returns the pool's data block size, in 512-byte sectors.
    fn data_block_size(&self, pool: &str) -> Result<u64>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ShellDmSetup;

impl DmSetup for ShellDmSetup {
    fn status(&self, pool: &str) -> Result<(u64, u64)> {
        let output = Command::new("dmsetup")
            .arg("status")
            .arg(pool)
            .output()
            .map_err(|e| CollectorError::Other(e.into()))?;
        if !output.status.success() {
            return Err(CollectorError::UsageUnknown(pool.into()));
        }
        parse_status(&String::from_utf8_lossy(&output.stdout), pool)
    }

    fn data_block_size(&self, pool: &str) -> Result<u64> {
        let output = Command::new("dmsetup")
            .arg("table")
            .arg(pool)
            .output()
            .map_err(|e| CollectorError::Other(e.into()))?;
        if !output.status.success() {
            return Err(CollectorError::UsageUnknown(pool.into()));
        }
        parse_table(&String::from_utf8_lossy(&output.stdout), pool)
    }
}

fn parse_status(raw: &str, pool: &str) -> Result<(u64, u64)> {
    let normalized = raw.replace('/', " ");
    let fields: Vec<&str> = normalized.split_whitespace().collect();
    let used = fields.get(6).and_then(|f| util::parse_u64_str(f));
    let total = fields.get(7).and_then(|f| util::parse_u64_str(f));
    match (used, total) {
        (Some(used), Some(total)) => Ok((used, total)),
        _ => Err(CollectorError::UsageUnknown(pool.into())),
    }
}

fn parse_table(raw: &str, pool: &str) -> Result<u64> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    fields
        .get(5)
        .and_then(|f| util::parse_u64_str(f))
        .ok_or_else(|| CollectorError::UsageUnknown(pool.into()))
}

/// Converts devicemapper blocks (field[6]/[7]) to bytes (spec.md
/// §4.2.12: `bytes = field[6]/[7] * 512 * blockSize`).
#[must_use]
pub fn blocks_to_bytes(blocks: u64, block_size: u64) -> u64 { blocks * BLOCK_SIZE_BYTES * block_size }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_used_total_blocks() {
        let raw = "0 20971520 thin-pool 0 526/524288 7497/2097152 - rw discard_passdown";
        let (used, total) = parse_status(raw, "pool").unwrap();
        assert_eq!((used, total), (7497, 2_097_152));
    }

    #[test]
    fn malformed_status_errors() {
        assert!(parse_status("nonsense", "pool").is_err());
    }

    #[test]
    fn parses_data_block_size_from_table() {
        let raw = "0 20971520 thin-pool 253:0 253:1 128 32768 1 skip_block_zeroing";
        assert_eq!(parse_table(raw, "pool").unwrap(), 128);
    }

    #[test]
    fn malformed_table_errors() {
        assert!(parse_table("nonsense", "pool").is_err());
    }
}
