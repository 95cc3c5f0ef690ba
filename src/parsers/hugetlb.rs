//! Hugetlb cgroup reader (spec.md §4.2.7).

use std::path::Path;

use crate::errors::Result;
use crate::model::{HugetlbStats, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

/// Host-wide directory enumerated for the set of live hugepage sizes;
/// not per-container, so it isn't part of the option bag.
const HUGEPAGES_DIR: &str = "/sys/kernel/mm/hugepages";

pub struct HugetlbParser;

impl Parser for HugetlbParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let cgroup_path = opts.cgroup_path()?;
        let mut hugetlb = std::collections::BTreeMap::new();

        for size_bytes in enumerate_page_sizes(Path::new(HUGEPAGES_DIR))? {
            let label = util::humanize_hugepage_bytes(size_bytes);
            hugetlb.insert(label.clone(), HugetlbStats {
                usage: cgroup_file::read_u64(&cgroup_path.join(format!("hugetlb.{}.usage_in_bytes", label)))?,
                max_usage: cgroup_file::read_u64(&cgroup_path.join(format!("hugetlb.{}.max_usage_in_bytes", label)))?,
                failcnt: cgroup_file::read_u64(&cgroup_path.join(format!("hugetlb.{}.failcnt", label)))?,
            });
        }

        stats.cgroups.hugetlb_stats = hugetlb;
        Ok(())
    }
}

/// Lists `hugepages-<n>kB` entries under `dir`, returning each size in
/// bytes. A missing directory (no hugetlb support) yields no sizes.
fn enumerate_page_sizes(dir: &Path) -> Result<Vec<u64>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut sizes = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(kb) = parse_page_size_kb(&name) {
            sizes.push(kb * 1024);
        }
    }
    sizes.sort_unstable();
    Ok(sizes)
}

fn parse_page_size_kb(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("hugepages-")?.strip_suffix("kB")?;
    util::parse_u64_str(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hugepage_directory_name() {
        assert_eq!(parse_page_size_kb("hugepages-2048kB"), Some(2048));
        assert_eq!(parse_page_size_kb("not-a-hugepage-dir"), None);
    }

    #[test]
    fn enumerate_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nonexistent");
        assert_eq!(enumerate_page_sizes(&missing).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn enumerate_sorts_by_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("hugepages-1048576kB")).unwrap();
        std::fs::create_dir(dir.path().join("hugepages-2048kB")).unwrap();
        let sizes = enumerate_page_sizes(dir.path()).unwrap();
        assert_eq!(sizes, vec![2048 * 1024, 1_048_576 * 1024]);
    }
}
