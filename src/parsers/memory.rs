//! Memory cgroup readers (spec.md §4.2.5). Split into five small
//! parsers so the resolver only pays for the query groups a batch
//! actually asks for: the full `memory.stat` ingest is comparatively
//! expensive, so a request for just `cache` uses the cheap path.

use crate::errors::Result;
use crate::model::{MemoryData, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

fn read_triple(cgroup_path: &std::path::Path, prefix: &str) -> Result<MemoryData> {
    Ok(MemoryData {
        usage: cgroup_file::read_u64(&cgroup_path.join(format!("{}.usage_in_bytes", prefix)))?,
        max_usage: cgroup_file::read_u64(&cgroup_path.join(format!("{}.max_usage_in_bytes", prefix)))?,
        failcnt: cgroup_file::read_u64(&cgroup_path.join(format!("{}.failcnt", prefix)))?,
    })
}

/// Cheap reader used when only `cache` is requested.
pub struct CacheParser;

impl Parser for CacheParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let content = cgroup_file::read_string(&opts.cgroup_path()?.join("memory.stat"))?;
        let cache = cgroup_file::kv_lines(&content)
            .find(|(k, _)| *k == "cache")
            .and_then(|(_, v)| util::parse_u64_str(v))
            .unwrap_or(0);
        stats.cgroups.memory_stats.cache = cache;
        Ok(())
    }
}

pub struct UsageParser;

impl Parser for UsageParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        stats.cgroups.memory_stats.usage = read_triple(opts.cgroup_path()?, "memory")?;
        Ok(())
    }
}

pub struct SwapUsageParser;

impl Parser for SwapUsageParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        stats.cgroups.memory_stats.swap_usage = read_triple(opts.cgroup_path()?, "memory.memsw")?;
        Ok(())
    }
}

pub struct KernelUsageParser;

impl Parser for KernelUsageParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        stats.cgroups.memory_stats.kernel_usage = read_triple(opts.cgroup_path()?, "memory.kmem")?;
        Ok(())
    }
}

/// Full `memory.stat` ingest: every line is stored verbatim (spec.md
/// §4.2.5), then `working_set` is recomputed per the §3 invariant.
pub struct StatisticsParser;

impl Parser for StatisticsParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let content = cgroup_file::read_string(&opts.cgroup_path()?.join("memory.stat"))?;
        for (key, value) in cgroup_file::kv_lines(&content) {
            let value = util::parse_u64_str(value).unwrap_or(0);
            stats.cgroups.memory_stats.statistics.insert(key.to_owned(), value);
        }
        stats.cgroups.memory_stats.recompute_working_set();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn statistics_parser_ingests_and_recomputes_working_set() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("memory.stat"),
            "cache 10\nrss 20\ntotal_inactive_anon 5\ntotal_inactive_file 7\n",
        )
        .unwrap();

        let mut stats = Statistics::default();
        stats.cgroups.memory_stats.usage.usage = 100;
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        StatisticsParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.memory_stats.statistics["cache"], 10);
        assert_eq!(stats.cgroups.memory_stats.statistics["working_set"], 88);
    }

    #[test]
    fn cache_parser_only_touches_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.stat"), "cache 42\nrss 99\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        CacheParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.memory_stats.cache, 42);
        assert_eq!(stats.cgroups.memory_stats.statistics["rss"], 0);
    }

    #[test]
    fn usage_parser_reads_triple() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.usage_in_bytes"), "100\n").unwrap();
        fs::write(dir.path().join("memory.max_usage_in_bytes"), "200\n").unwrap();
        fs::write(dir.path().join("memory.failcnt"), "1\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        UsageParser.update(&mut stats, &opts).unwrap();

        assert_eq!(stats.cgroups.memory_stats.usage, MemoryData { usage: 100, max_usage: 200, failcnt: 1 });
    }
}
