//! Network device statistics, container and host variants (spec.md
//! §4.2.9, §4.2.10).

use std::path::Path;

use crate::errors::{CollectorError, Result};
use crate::model::{self, NetworkInterface, Statistics};
use crate::util;

use super::{cgroup_file, Options, Parser};

pub struct NetworkParser;

impl Parser for NetworkParser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()> {
        let mut interfaces =
            if opts.is_host { read_host_interfaces()? } else { read_container_interfaces(opts)? };
        model::append_total_row(&mut interfaces);
        stats.network = interfaces;
        Ok(())
    }
}

/// Reads `<procfs>/<pid>/net/dev`, skipping the two header lines (spec.md
/// §4.2.9).
fn read_container_interfaces(opts: &Options) -> Result<Vec<NetworkInterface>> {
    let path = opts.procfs()?.join(opts.pid()?.to_string()).join("net").join("dev");
    let content = cgroup_file::read_string(&path)?;

    let mut interfaces = Vec::new();
    for line in content.lines().skip(2) {
        let line = line.replace(':', " ");
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 17 {
            return Err(CollectorError::UnknownField(format!(
                "net/dev line has {} fields, expected 17",
                fields.len()
            )));
        }
        let name = fields[0];
        if model::is_ignored_interface(name) {
            continue;
        }
        interfaces.push(NetworkInterface {
            name: name.to_owned(),
            rx_bytes: parse(fields[1]),
            rx_packets: parse(fields[2]),
            rx_errors: parse(fields[3]),
            rx_dropped: parse(fields[4]),
            tx_bytes: parse(fields[9]),
            tx_packets: parse(fields[10]),
            tx_errors: parse(fields[11]),
            tx_dropped: parse(fields[12]),
        });
    }
    Ok(interfaces)
}

/// Reads `/sys/class/net/<iface>/statistics/*` for every non-ignored
/// interface (spec.md §4.2.10).
fn read_host_interfaces() -> Result<Vec<NetworkInterface>> {
    const SYS_CLASS_NET: &str = "/sys/class/net";
    let entries = match std::fs::read_dir(SYS_CLASS_NET) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut interfaces = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if model::is_ignored_interface(&name) {
            continue;
        }
        let stats_dir = entry.path().join("statistics");
        interfaces.push(NetworkInterface {
            rx_bytes: read_counter(&stats_dir, "rx_bytes")?,
            rx_packets: read_counter(&stats_dir, "rx_packets")?,
            rx_errors: read_counter(&stats_dir, "rx_errors")?,
            rx_dropped: read_counter(&stats_dir, "rx_dropped")?,
            tx_bytes: read_counter(&stats_dir, "tx_bytes")?,
            tx_packets: read_counter(&stats_dir, "tx_packets")?,
            tx_errors: read_counter(&stats_dir, "tx_errors")?,
            tx_dropped: read_counter(&stats_dir, "tx_dropped")?,
            name,
        });
    }
    Ok(interfaces)
}

fn read_counter(stats_dir: &Path, metric: &str) -> Result<u64> { cgroup_file::read_u64(&stats_dir.join(metric)) }

fn parse(field: &str) -> u64 { util::parse_u64_str(field).unwrap_or(0) }
