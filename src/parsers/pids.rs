//! `pids.current`, `pids.max` (spec.md §4.2.8).

use crate::errors::Result;
use crate::model::{PidsStats, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

pub struct PidsParser;

impl Parser for PidsParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let cgroup_path = opts.cgroup_path()?;

        let current = cgroup_file::read_u64(&cgroup_path.join("pids.current"))?;
        let raw_max = cgroup_file::read_string(&cgroup_path.join("pids.max"))?;
        let limit = match raw_max.trim() {
            "max" => 0,
            other => util::parse_u64_str(other).unwrap_or(0),
        };

        stats.cgroups.pids_stats = PidsStats { current, limit };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scenario_from_spec() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pids.current"), "1\n").unwrap();
        fs::write(dir.path().join("pids.max"), "max\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        PidsParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.pids_stats, PidsStats { current: 1, limit: 0 });
    }

    #[test]
    fn numeric_limit_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pids.current"), "3\n").unwrap();
        fs::write(dir.path().join("pids.max"), "512\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        PidsParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.pids_stats, PidsStats { current: 3, limit: 512 });
    }
}
