//! `cpuset.{cpus,mems,memory_migrate,cpu_exclusive,mem_exclusive}`
//! (spec.md §4.2.4).

use crate::errors::Result;
use crate::model::{CpuSetStats, Statistics};

use super::{cgroup_file, Options, Parser};

pub struct CpuSetParser;

impl Parser for CpuSetParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let cgroup_path = opts.cgroup_path()?;

        let cpus = cgroup_file::read_string(&cgroup_path.join("cpuset.cpus"))?;
        let mems = cgroup_file::read_string(&cgroup_path.join("cpuset.mems"))?;

        stats.cgroups.cpuset_stats = CpuSetStats {
            cpus: cpus.trim().to_owned(),
            mems: mems.trim().to_owned(),
            memory_migrate: cgroup_file::read_u64(&cgroup_path.join("cpuset.memory_migrate"))?,
            cpu_exclusive: cgroup_file::read_u64(&cgroup_path.join("cpuset.cpu_exclusive"))?,
            memory_exclusive: cgroup_file::read_u64(&cgroup_path.join("cpuset.mem_exclusive"))?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_strings_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpuset.cpus"), "0-3\n").unwrap();
        fs::write(dir.path().join("cpuset.mems"), "0\n").unwrap();
        fs::write(dir.path().join("cpuset.memory_migrate"), "1\n").unwrap();
        fs::write(dir.path().join("cpuset.cpu_exclusive"), "0\n").unwrap();
        fs::write(dir.path().join("cpuset.mem_exclusive"), "0\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        CpuSetParser.update(&mut stats, &opts).unwrap();

        let cs = &stats.cgroups.cpuset_stats;
        assert_eq!(cs.cpus, "0-3");
        assert_eq!(cs.mems, "0");
        assert_eq!(cs.memory_migrate, 1);
    }
}
