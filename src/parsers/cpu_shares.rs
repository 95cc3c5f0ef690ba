//! `cpu.shares` (spec.md §4.2.3).

use crate::errors::Result;
use crate::model::Statistics;

use super::{cgroup_file, Options, Parser};

pub struct CpuSharesParser;

impl Parser for CpuSharesParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let path = opts.cgroup_path()?.join("cpu.shares");
        stats.cgroups.cpu_stats.cpu_shares = cgroup_file::read_u64(&path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_single_decimal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpu.shares"), "1024\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        CpuSharesParser.update(&mut stats, &opts).unwrap();
        assert_eq!(stats.cgroups.cpu_stats.cpu_shares, 1024);
    }
}
