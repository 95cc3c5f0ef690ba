//! Block I/O cgroup reader (spec.md §4.2.6). Probes for the CFQ
//! `_recursive` files; falls back to the throttle files when CFQ is not
//! enabled (non-CFQ I/O schedulers, or `blk-mq` devices).

use std::path::Path;

use crate::errors::{CollectorError, Result};
use crate::model::{BlkioEntry, BlkioOp, BlkioStats, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

pub struct BlkioParser;

impl Parser for BlkioParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let cgroup_path = opts.cgroup_path()?;

        let probe = cgroup_file::read_optional(&cgroup_path.join("blkio.io_serviced_recursive"))?;
        let cfq_enabled = probe.as_deref().map(|c| !c.trim().is_empty()).unwrap_or(false);

        let mut blkio = BlkioStats::default();
        if cfq_enabled {
            blkio.sectors_recursive = read_entries(&cgroup_path.join("blkio.sectors_recursive"))?;
            blkio.io_service_bytes_recursive = read_entries(&cgroup_path.join("blkio.io_service_bytes_recursive"))?;
            blkio.io_serviced_recursive = read_entries(&cgroup_path.join("blkio.io_serviced_recursive"))?;
            blkio.io_queue_recursive = read_entries(&cgroup_path.join("blkio.io_queue_recursive"))?;
            blkio.io_service_time_recursive = read_entries(&cgroup_path.join("blkio.io_service_time_recursive"))?;
            blkio.io_wait_time_recursive = read_entries(&cgroup_path.join("blkio.io_wait_time_recursive"))?;
            blkio.io_merged_recursive = read_entries(&cgroup_path.join("blkio.io_merged_recursive"))?;
            blkio.io_time_recursive = read_entries(&cgroup_path.join("blkio.io_time_recursive"))?;
        } else {
            blkio.io_service_bytes_recursive = read_entries(&cgroup_path.join("blkio.throttle.io_service_bytes"))?;
            blkio.io_serviced_recursive = read_entries(&cgroup_path.join("blkio.throttle.io_serviced"))?;
        }

        stats.cgroups.blkio_stats = blkio;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<Vec<BlkioEntry>> {
    let content = match cgroup_file::read_optional(path)? {
        Some(c) => c,
        None => return Ok(Vec::new()),
    };
    util::lines(&content).filter(|line| !skip_total_line(line)).map(parse_line).collect()
}

/// Splits a line on whitespace and `:` (spec.md §4.2.6 "per-line
/// format"). A two-word `Total N` line is skipped; three words are
/// `{major, minor, value}`; four words are `{major, minor, op, value}`.
fn parse_line(line: &str) -> Result<BlkioEntry> {
    let words: Vec<&str> = line.split(|c: char| c.is_whitespace() || c == ':').filter(|w| !w.is_empty()).collect();
    match words.as_slice() {
        [major, minor, value] => Ok(BlkioEntry {
            major: util::parse_u64_str(major).unwrap_or(0),
            minor: util::parse_u64_str(minor).unwrap_or(0),
            op: None,
            value: util::parse_u64_str(value).unwrap_or(0),
        }),
        [major, minor, op, value] => Ok(BlkioEntry {
            major: util::parse_u64_str(major).unwrap_or(0),
            minor: util::parse_u64_str(minor).unwrap_or(0),
            op: BlkioOp::parse(op),
            value: util::parse_u64_str(value).unwrap_or(0),
        }),
        _ => Err(CollectorError::BadBlkioLine(line.to_owned())),
    }
}

/// A bare two-word `Total 500` line is the grand-total row and is
/// skipped rather than parsed (spec.md §4.2.6). `parse_line` above
/// only ever sees lines already filtered by `skip_total_line`.
fn skip_total_line(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    words.len() == 2 && words[0] == "Total"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_entries_from(content: &str) -> Vec<BlkioEntry> {
        util::lines(content).filter(|l| !skip_total_line(l)).map(parse_line).collect::<Result<_>>().unwrap()
    }

    #[test]
    fn scenario_from_spec() {
        let content = "8:0 Read 100\n8:0 Write 200\n8:0 Sync 300\n8:0 Async 500\n8:0 Total 500\nTotal 500\n";
        let entries = read_entries_from(content);
        assert_eq!(entries, vec![
            BlkioEntry { major: 8, minor: 0, op: Some(BlkioOp::Read), value: 100 },
            BlkioEntry { major: 8, minor: 0, op: Some(BlkioOp::Write), value: 200 },
            BlkioEntry { major: 8, minor: 0, op: Some(BlkioOp::Sync), value: 300 },
            BlkioEntry { major: 8, minor: 0, op: Some(BlkioOp::Async), value: 500 },
            BlkioEntry { major: 8, minor: 0, op: Some(BlkioOp::Total), value: 500 },
        ]);
    }

    #[test]
    fn three_word_line_has_no_op() {
        let entry = parse_line("8:0 1234").unwrap();
        assert_eq!(entry, BlkioEntry { major: 8, minor: 0, op: None, value: 1234 });
    }

    #[test]
    fn malformed_line_fails() {
        let err = parse_line("garbage").unwrap_err();
        assert!(matches!(err, CollectorError::BadBlkioLine(_)));
    }

    #[test]
    fn cfq_disabled_falls_back_to_throttle_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blkio.io_serviced_recursive"), "").unwrap();
        std::fs::write(dir.path().join("blkio.throttle.io_service_bytes"), "8:0 Read 100\n").unwrap();
        std::fs::write(dir.path().join("blkio.throttle.io_serviced"), "8:0 Read 1\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        BlkioParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.blkio_stats.io_service_bytes_recursive.len(), 1);
        assert_eq!(stats.cgroups.blkio_stats.io_queue_recursive.len(), 0);
    }
}
