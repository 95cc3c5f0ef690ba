//! `cpuacct.stat`, `cpuacct.usage_percpu`, `cpuacct.usage` (spec.md §4.2.2).

use crate::errors::{CollectorError, Result};
use crate::model::{CpuUsage, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

pub struct CpuAcctParser;

impl Parser for CpuAcctParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let cgroup_path = opts.cgroup_path()?;

        let stat_content = cgroup_file::read_string(&cgroup_path.join("cpuacct.stat"))?;
        let mut usage = CpuUsage::default();
        for (key, value) in cgroup_file::kv_lines(&stat_content) {
            let value = util::parse_u64_str(value).unwrap_or(0);
            match key {
                "user" => usage.user_mode = value,
                "system" => usage.kernel_mode = value,
                other => return Err(CollectorError::UnknownField(other.to_owned())),
            }
        }

        let percpu_content = cgroup_file::read_string(&cgroup_path.join("cpuacct.usage_percpu"))?;
        usage.per_cpu = cgroup_file::u64_array(&percpu_content);

        usage.total = cgroup_file::read_u64(&cgroup_path.join("cpuacct.usage"))?;

        stats.cgroups.cpu_stats.cpu_usage = usage;
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
        fs::write(dir.path().join("cpuacct.stat"), "user 11111111\nsystem 22222222\n").unwrap();
        fs::write(dir.path().join("cpuacct.usage"), "3333333333").unwrap();
        fs::write(dir.path().join("cpuacct.usage_percpu"), "44444444 555555555").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        CpuAcctParser.update(&mut stats, &opts).unwrap();

        let usage = stats.cgroups.cpu_stats.cpu_usage;
        assert_eq!(usage.user_mode, 11_111_111);
        assert_eq!(usage.kernel_mode, 22_222_222);
        assert_eq!(usage.total, 3_333_333_333);
        assert_eq!(usage.per_cpu, vec![44_444_444, 555_555_555]);
    }
}
