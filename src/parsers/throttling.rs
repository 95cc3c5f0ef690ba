//! `cpu.stat` (spec.md §4.2.1).

use crate::errors::{CollectorError, Result};
use crate::model::{Statistics, ThrottlingData};
use crate::util;

use super::{cgroup_file, Options, Parser};

pub struct ThrottlingParser;

impl Parser for ThrottlingParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let path = opts.cgroup_path()?.join("cpu.stat");
        let content = cgroup_file::read_string(&path)?;

        let mut throttling = ThrottlingData::default();
        for (key, value) in cgroup_file::kv_lines(&content) {
            let value = util::parse_u64_str(value).unwrap_or(0);
            match key {
                "nr_periods" => throttling.nr_periods = value,
                "nr_throttled" => throttling.nr_throttled = value,
                "throttled_time" => throttling.throttled_time = value,
                other => return Err(CollectorError::UnknownField(other.to_owned())),
            }
        }
        stats.cgroups.cpu_stats.throttling_data = throttling;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_known_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpu.stat"), "nr_periods 1\nnr_throttled 2\nthrottled_time 3\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        ThrottlingParser.update(&mut stats, &opts).unwrap();

        let td = stats.cgroups.cpu_stats.throttling_data;
        assert_eq!((td.nr_periods, td.nr_throttled, td.throttled_time), (1, 2, 3));
    }

    #[test]
    fn unknown_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpu.stat"), "mystery_key 1\n").unwrap();

        let mut stats = Statistics::default();
        let opts = Options { cgroup_path: Some(dir.path().to_path_buf()), ..Default::default() };
        let err = ThrottlingParser.update(&mut stats, &opts).unwrap_err();
        assert!(matches!(err, CollectorError::UnknownField(_)));
    }
}
