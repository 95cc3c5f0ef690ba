//! Static body schema and value extraction (spec.md §4.4, §4.5 step 5).
//! Reimplements the source's reflection-driven schema walk as an
//! explicit, hand-enumerated table (spec.md §9 "reflective schema
//! building"): the resolver dispatches on query group rather than on
//! runtime type information.

use std::collections::BTreeMap;

use crate::errors::{CollectorError, Result};
use crate::model::{self, Statistics};
use crate::parsers::QueryGroup;

/// A resolved metric value's payload (spec.md §4.5 "typed value").
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt(u64),
    Str(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
        }
    }
}

/// One segment of a static body template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    /// Logical name of the dynamic placeholder (spec.md §4.4 table),
    /// e.g. `cpu_id`, `device_name`.
    Dynamic(&'static str),
}

#[derive(Debug, Clone)]
pub struct SchemaLeaf {
    pub segments: Vec<Segment>,
    pub group: QueryGroup,
}

fn lit(path: &str) -> Vec<Segment> { path.split('/').map(Segment::Literal).collect() }

fn leaf(path: &str, group: QueryGroup) -> SchemaLeaf { SchemaLeaf { segments: lit(path), group } }

fn dynamic_leaf(prefix: &str, dynamic_name: &'static str, suffix: &str, group: QueryGroup) -> SchemaLeaf {
    let mut segments = lit(prefix);
    segments.push(Segment::Dynamic(dynamic_name));
    segments.extend(lit(suffix));
    SchemaLeaf { segments, group }
}

/// The closed dynamic-segment table (spec.md §4.4).
pub const CPU_ID: &str = "cpu_id";
pub const DEVICE_NAME: &str = "device_name";
pub const LABEL_KEY: &str = "label_key";
pub const NETWORK_INTERFACE: &str = "network_interface";
pub const HUGETLB_SIZE: &str = "size";

/// Builds the full set of static body leaves by hand, grounded on the
/// `Statistics` aggregate's field layout (spec.md §3).
#[must_use]
pub fn body_schema() -> Vec<SchemaLeaf> {
    let mut leaves = Vec::new();

    leaves.push(leaf("cgroups/cpu_stats/throttling_data/nr_periods", QueryGroup::ThrottlingData));
    leaves.push(leaf("cgroups/cpu_stats/throttling_data/nr_throttled", QueryGroup::ThrottlingData));
    leaves.push(leaf("cgroups/cpu_stats/throttling_data/throttled_time", QueryGroup::ThrottlingData));

    leaves.push(leaf("cgroups/cpu_stats/cpu_usage/total", QueryGroup::CpuUsage));
    leaves.push(leaf("cgroups/cpu_stats/cpu_usage/user_mode", QueryGroup::CpuUsage));
    leaves.push(leaf("cgroups/cpu_stats/cpu_usage/kernel_mode", QueryGroup::CpuUsage));
    leaves.push(dynamic_leaf("cgroups/cpu_stats/cpu_usage/per_cpu", CPU_ID, "value", QueryGroup::CpuUsage));

    leaves.push(leaf("cgroups/cpu_stats/cpu_shares", QueryGroup::CpuShares));

    leaves.push(leaf("cgroups/memory_stats/cache", QueryGroup::Cache));
    for field in ["usage", "max_usage", "failcnt"] {
        leaves.push(leaf(&format!("cgroups/memory_stats/usage/{}", field), QueryGroup::Usage));
        leaves.push(leaf(&format!("cgroups/memory_stats/swap_usage/{}", field), QueryGroup::SwapUsage));
        leaves.push(leaf(&format!("cgroups/memory_stats/kernel_usage/{}", field), QueryGroup::KernelUsage));
    }
    // `statistics` is a mapping, but over a closed, compile-time-known
    // key set (spec.md §3), so each key is its own static leaf rather
    // than a dynamic segment.
    for key in model::MEMORY_STAT_KEYS {
        leaves.push(leaf(&format!("cgroups/memory_stats/statistics/{}", key), QueryGroup::Statistics));
    }

    for array in [
        "sectors_recursive",
        "io_service_bytes_recursive",
        "io_serviced_recursive",
        "io_queue_recursive",
        "io_service_time_recursive",
        "io_wait_time_recursive",
        "io_merged_recursive",
        "io_time_recursive",
    ] {
        leaves.push(dynamic_leaf(
            &format!("cgroups/blkio_stats/{}", array),
            DEVICE_NAME,
            "value",
            QueryGroup::BlkioStats,
        ));
    }

    for field in ["usage", "max_usage", "failcnt"] {
        leaves.push(dynamic_leaf("cgroups/hugetlb_stats", HUGETLB_SIZE, field, QueryGroup::HugetlbStats));
    }

    leaves.push(leaf("cgroups/pids_stats/current", QueryGroup::PidsStats));
    leaves.push(leaf("cgroups/pids_stats/limit", QueryGroup::PidsStats));

    for field in ["cpus", "mems", "memory_migrate", "cpu_exclusive", "memory_exclusive"] {
        leaves.push(leaf(&format!("cgroups/cpuset_stats/{}", field), QueryGroup::CpuSetStats));
    }

    for field in ["rx_bytes", "rx_packets", "rx_errors", "rx_dropped", "tx_bytes", "tx_packets", "tx_errors", "tx_dropped"]
    {
        leaves.push(dynamic_leaf("network", NETWORK_INTERFACE, field, QueryGroup::Network));
    }

    for (prefix, group) in [("connection/tcp", QueryGroup::Tcp), ("connection/tcp6", QueryGroup::Tcp6)] {
        for field in [
            "established", "syn_sent", "syn_recv", "fin_wait1", "fin_wait2", "time_wait", "close", "close_wait",
            "last_ack", "listen", "closing",
        ] {
            leaves.push(leaf(&format!("{}/{}", prefix, field), group));
        }
    }

    for field in ["device", "type", "limit", "usage", "base_usage", "available", "inodes_free"] {
        leaves.push(dynamic_leaf("filesystem", DEVICE_NAME, field, QueryGroup::Filesystem));
    }
    for field in [
        "reads_completed", "reads_merged", "sectors_read", "read_time", "writes_completed", "writes_merged",
        "sectors_written", "write_time", "io_in_progress", "io_time", "weighted_io_time",
    ] {
        leaves.push(dynamic_leaf("filesystem", DEVICE_NAME, &format!("disk/{}", field), QueryGroup::Filesystem));
    }

    for field in ["status", "created", "image", "size_rw", "size_root_fs"] {
        leaves.push(leaf(&format!("spec/{}", field), QueryGroup::Spec));
    }
    leaves.push(dynamic_leaf("spec/labels", LABEL_KEY, "value", QueryGroup::Spec));

    leaves
}

fn segment_string(segment: &Segment) -> &'static str {
    match segment {
        Segment::Literal(s) => s,
        Segment::Dynamic(_) => "*",
    }
}

/// Renders a leaf's static template body, with every dynamic position
/// shown as `*` (spec.md §4.4 "static body schema").
#[must_use]
pub fn template_body(leaf: &SchemaLeaf) -> String {
    leaf.segments.iter().map(segment_string).collect::<Vec<_>>().join("/")
}

/// Extracts concrete `(resolved_body, value)` pairs for one leaf given
/// a live `Statistics`, resolving any dynamic segment (spec.md §4.5
/// step 5). `requested` is the caller's body path; a concrete index in
/// a dynamic position narrows to that one entity, `*` expands to all.
pub fn extract(stats: &Statistics, leaf: &SchemaLeaf, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    match leaf.group {
        QueryGroup::ThrottlingData => {
            let td = &stats.cgroups.cpu_stats.throttling_data;
            scalar_leaf(leaf, |field| match field {
                "nr_periods" => Some(Value::UInt(td.nr_periods)),
                "nr_throttled" => Some(Value::UInt(td.nr_throttled)),
                "throttled_time" => Some(Value::UInt(td.throttled_time)),
                _ => None,
            })
        },
        QueryGroup::CpuUsage if has_dynamic(leaf) => {
            let per_cpu = &stats.cgroups.cpu_stats.cpu_usage.per_cpu;
            extract_indexed(leaf, requested, per_cpu.len(), |i| Value::UInt(per_cpu[i]))
        },
        QueryGroup::CpuUsage => {
            let usage = &stats.cgroups.cpu_stats.cpu_usage;
            scalar_leaf(leaf, |field| match field {
                "total" => Some(Value::UInt(usage.total)),
                "user_mode" => Some(Value::UInt(usage.user_mode)),
                "kernel_mode" => Some(Value::UInt(usage.kernel_mode)),
                _ => None,
            })
        },
        QueryGroup::CpuShares => Ok(vec![(template_body(leaf), Value::UInt(stats.cgroups.cpu_stats.cpu_shares))]),
        QueryGroup::Cache => Ok(vec![(template_body(leaf), Value::UInt(stats.cgroups.memory_stats.cache))]),
        QueryGroup::Usage => memory_triple(leaf, &stats.cgroups.memory_stats.usage),
        QueryGroup::SwapUsage => memory_triple(leaf, &stats.cgroups.memory_stats.swap_usage),
        QueryGroup::KernelUsage => memory_triple(leaf, &stats.cgroups.memory_stats.kernel_usage),
        QueryGroup::Statistics => {
            let key = leaf.segments.last().and_then(|s| match s {
                Segment::Literal(s) => Some(*s),
                Segment::Dynamic(_) => None,
            });
            let key = key.ok_or_else(|| CollectorError::UnknownDynamicElement(template_body(leaf)))?;
            let value = *stats.cgroups.memory_stats.statistics.get(key).unwrap_or(&0);
            Ok(vec![(template_body(leaf), Value::UInt(value))])
        },
        QueryGroup::BlkioStats => extract_blkio(stats, leaf, requested),
        QueryGroup::HugetlbStats => extract_hugetlb(stats, leaf, requested),
        QueryGroup::PidsStats => {
            let pids = &stats.cgroups.pids_stats;
            scalar_leaf(leaf, |field| match field {
                "current" => Some(Value::UInt(pids.current)),
                "limit" => Some(Value::UInt(pids.limit)),
                _ => None,
            })
        },
        QueryGroup::CpuSetStats => {
            let cs = &stats.cgroups.cpuset_stats;
            scalar_leaf(leaf, |field| match field {
                "cpus" => Some(Value::Str(cs.cpus.clone())),
                "mems" => Some(Value::Str(cs.mems.clone())),
                "memory_migrate" => Some(Value::UInt(cs.memory_migrate)),
                "cpu_exclusive" => Some(Value::UInt(cs.cpu_exclusive)),
                "memory_exclusive" => Some(Value::UInt(cs.memory_exclusive)),
                _ => None,
            })
        },
        QueryGroup::Network => extract_network(stats, leaf, requested),
        QueryGroup::Tcp => tcp_field(&stats.connection.tcp, leaf),
        QueryGroup::Tcp6 => tcp_field(&stats.connection.tcp6, leaf),
        QueryGroup::Filesystem => extract_filesystem(stats, leaf, requested),
        QueryGroup::Spec => extract_spec_from_body(leaf, requested),
    }
}

fn has_dynamic(leaf: &SchemaLeaf) -> bool { leaf.segments.iter().any(|s| matches!(s, Segment::Dynamic(_))) }

fn scalar_leaf(leaf: &SchemaLeaf, lookup: impl Fn(&str) -> Option<Value>) -> Result<Vec<(String, Value)>> {
    let field = match leaf.segments.last() {
        Some(Segment::Literal(s)) => *s,
        _ => return Err(CollectorError::UnknownDynamicElement(template_body(leaf))),
    };
    let value = lookup(field).ok_or_else(|| CollectorError::UnknownField(field.to_owned()))?;
    Ok(vec![(template_body(leaf), value)])
}

fn memory_triple(leaf: &SchemaLeaf, data: &model::MemoryData) -> Result<Vec<(String, Value)>> {
    scalar_leaf(leaf, |field| match field {
        "usage" => Some(Value::UInt(data.usage)),
        "max_usage" => Some(Value::UInt(data.max_usage)),
        "failcnt" => Some(Value::UInt(data.failcnt)),
        _ => None,
    })
}

/// Resolves a dynamic index position against `requested`: a concrete
/// decimal index narrows to that entity (`UnknownDynamicValue` if
/// out-of-range), `*` expands to every index.
fn extract_indexed(
    leaf: &SchemaLeaf,
    requested: &[&str],
    len: usize,
    at: impl Fn(usize) -> Value,
) -> Result<Vec<(String, Value)>> {
    let dynamic_pos = leaf.segments.iter().position(|s| matches!(s, Segment::Dynamic(_))).expect("has_dynamic checked");
    let requested_token = requested.get(dynamic_pos).copied().unwrap_or("*");

    let indices: Vec<usize> = if requested_token == "*" {
        (0 .. len).collect()
    } else {
        let idx = requested_token
            .parse::<usize>()
            .map_err(|_| CollectorError::UnknownDynamicValue {
                name: requested_token.to_owned(),
                reason: "not a valid index".to_owned(),
            })?;
        if idx >= len {
            return Err(CollectorError::UnknownDynamicValue {
                name: requested_token.to_owned(),
                reason: format!("index {} out of range (len {})", idx, len),
            });
        }
        vec![idx]
    };

    Ok(indices
        .into_iter()
        .map(|i| (render_with_resolved(leaf, dynamic_pos, &i.to_string()), at(i)))
        .collect())
}

fn render_with_resolved(leaf: &SchemaLeaf, dynamic_pos: usize, resolved: &str) -> String {
    leaf.segments
        .iter()
        .enumerate()
        .map(|(i, s)| if i == dynamic_pos { resolved.to_owned() } else { segment_string(s).to_owned() })
        .collect::<Vec<_>>()
        .join("/")
}

fn extract_blkio(stats: &Statistics, leaf: &SchemaLeaf, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    // Segments are `cgroups/blkio_stats/<array>/<device_name>/value`;
    // the array name is the literal just before the dynamic position.
    let array_name = match leaf.segments.get(2) {
        Some(Segment::Literal(s)) => *s,
        _ => unreachable!("blkio leaves always carry the array name at index 2"),
    };
    let entries = match array_name {
        "sectors_recursive" => &stats.cgroups.blkio_stats.sectors_recursive,
        "io_service_bytes_recursive" => &stats.cgroups.blkio_stats.io_service_bytes_recursive,
        "io_serviced_recursive" => &stats.cgroups.blkio_stats.io_serviced_recursive,
        "io_queue_recursive" => &stats.cgroups.blkio_stats.io_queue_recursive,
        "io_service_time_recursive" => &stats.cgroups.blkio_stats.io_service_time_recursive,
        "io_wait_time_recursive" => &stats.cgroups.blkio_stats.io_wait_time_recursive,
        "io_merged_recursive" => &stats.cgroups.blkio_stats.io_merged_recursive,
        "io_time_recursive" => &stats.cgroups.blkio_stats.io_time_recursive,
        other => return Err(CollectorError::UnknownDynamicElement(other.to_owned())),
    };
    extract_indexed(leaf, requested, entries.len(), |i| Value::UInt(entries[i].value))
}

fn extract_hugetlb(stats: &Statistics, leaf: &SchemaLeaf, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    let dynamic_pos = leaf.segments.iter().position(|s| matches!(s, Segment::Dynamic(_))).expect("hugetlb is dynamic");
    let field = match leaf.segments.last() {
        Some(Segment::Literal(s)) => *s,
        _ => unreachable!(),
    };
    let requested_token = requested.get(dynamic_pos).copied().unwrap_or("*");

    let keys: Vec<&String> = if requested_token == "*" {
        stats.cgroups.hugetlb_stats.keys().collect()
    } else {
        match stats.cgroups.hugetlb_stats.get_key_value(requested_token) {
            Some((k, _)) => vec![k],
            None => {
                return Err(CollectorError::UnknownDynamicValue {
                    name: requested_token.to_owned(),
                    reason: "unknown hugetlb page size".to_owned(),
                })
            },
        }
    };

    keys.into_iter()
        .map(|key| {
            let entry = &stats.cgroups.hugetlb_stats[key];
            let value = match field {
                "usage" => entry.usage,
                "max_usage" => entry.max_usage,
                "failcnt" => entry.failcnt,
                other => return Err(CollectorError::UnknownField(other.to_owned())),
            };
            Ok((render_with_resolved(leaf, dynamic_pos, key), Value::UInt(value)))
        })
        .collect()
}

fn extract_network(stats: &Statistics, leaf: &SchemaLeaf, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    let dynamic_pos = 1; // "network" / <iface> / <field>
    let field = match leaf.segments.last() {
        Some(Segment::Literal(s)) => *s,
        _ => unreachable!(),
    };
    let requested_token = requested.get(dynamic_pos).copied().unwrap_or("*");

    let interfaces: Vec<&model::NetworkInterface> = if requested_token == "*" {
        stats.network.iter().collect()
    } else {
        match stats.network.iter().find(|i| i.name == requested_token) {
            Some(iface) => vec![iface],
            None => {
                return Err(CollectorError::UnknownDynamicValue {
                    name: requested_token.to_owned(),
                    reason: "unknown network interface".to_owned(),
                })
            },
        }
    };

    interfaces
        .into_iter()
        .map(|iface| {
            let value = match field {
                "rx_bytes" => iface.rx_bytes,
                "rx_packets" => iface.rx_packets,
                "rx_errors" => iface.rx_errors,
                "rx_dropped" => iface.rx_dropped,
                "tx_bytes" => iface.tx_bytes,
                "tx_packets" => iface.tx_packets,
                "tx_errors" => iface.tx_errors,
                "tx_dropped" => iface.tx_dropped,
                other => return Err(CollectorError::UnknownField(other.to_owned())),
            };
            Ok((render_with_resolved(leaf, dynamic_pos, &iface.name), Value::UInt(value)))
        })
        .collect()
}

fn tcp_field(tcp: &model::TcpStat, leaf: &SchemaLeaf) -> Result<Vec<(String, Value)>> {
    scalar_leaf(leaf, |field| {
        Some(Value::UInt(match field {
            "established" => tcp.established,
            "syn_sent" => tcp.syn_sent,
            "syn_recv" => tcp.syn_recv,
            "fin_wait1" => tcp.fin_wait1,
            "fin_wait2" => tcp.fin_wait2,
            "time_wait" => tcp.time_wait,
            "close" => tcp.close,
            "close_wait" => tcp.close_wait,
            "last_ack" => tcp.last_ack,
            "listen" => tcp.listen,
            "closing" => tcp.closing,
            _ => return None,
        }))
    })
}

fn extract_filesystem(stats: &Statistics, leaf: &SchemaLeaf, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    let dynamic_pos = 1; // "filesystem" / <device> / <field...>
    let requested_token = requested.get(dynamic_pos).copied().unwrap_or("*");

    let devices: Vec<&String> = if requested_token == "*" {
        stats.filesystem.keys().collect()
    } else {
        match stats.filesystem.get_key_value(requested_token) {
            Some((k, _)) => vec![k],
            None => {
                return Err(CollectorError::UnknownDynamicValue {
                    name: requested_token.to_owned(),
                    reason: "unknown filesystem device".to_owned(),
                })
            },
        }
    };

    let tail: Vec<&str> = leaf.segments[dynamic_pos + 1 ..]
        .iter()
        .map(|s| match s {
            Segment::Literal(s) => *s,
            Segment::Dynamic(_) => unreachable!("filesystem has a single dynamic segment"),
        })
        .collect();

    devices
        .into_iter()
        .map(|device| {
            let fs = &stats.filesystem[device];
            let value = filesystem_field(fs, &tail)?;
            Ok((render_with_resolved(leaf, dynamic_pos, device), value))
        })
        .collect()
}

fn filesystem_field(fs: &model::FilesystemInterface, tail: &[&str]) -> Result<Value> {
    match tail {
        ["device"] => Ok(Value::Str(fs.device.clone())),
        ["type"] => Ok(Value::Str(format!("{:?}", fs.r#type).to_lowercase())),
        ["limit"] => Ok(Value::UInt(fs.limit)),
        ["usage"] => Ok(Value::UInt(fs.usage)),
        ["base_usage"] => Ok(Value::UInt(fs.base_usage)),
        ["available"] => Ok(Value::UInt(fs.available)),
        ["inodes_free"] => Ok(Value::UInt(fs.inodes_free)),
        ["disk", field] => Ok(Value::UInt(match *field {
            "reads_completed" => fs.disk.reads_completed,
            "reads_merged" => fs.disk.reads_merged,
            "sectors_read" => fs.disk.sectors_read,
            "read_time" => fs.disk.read_time,
            "writes_completed" => fs.disk.writes_completed,
            "writes_merged" => fs.disk.writes_merged,
            "sectors_written" => fs.disk.sectors_written,
            "write_time" => fs.disk.write_time,
            "io_in_progress" => fs.disk.io_in_progress,
            "io_time" => fs.disk.io_time,
            "weighted_io_time" => fs.disk.weighted_io_time,
            other => return Err(CollectorError::UnknownField(other.to_owned())),
        })),
        other => Err(CollectorError::UnknownField(other.join("/"))),
    }
}

/// `spec/*` fields read from the container entry's `Specification`, not
/// from `Statistics` — callers pass the specification fields in via
/// `requested`'s sibling lookup in the orchestrator; here we only
/// handle `spec/labels/*` which is a genuine per-batch dynamic lookup
/// once the orchestrator has copied labels into the statistics-adjacent
/// view. See `orchestrator::reproject_spec` for the non-dynamic fields.
fn extract_spec_from_body(leaf: &SchemaLeaf, _requested: &[&str]) -> Result<Vec<(String, Value)>> {
    Err(CollectorError::UnroutedMetric(template_body(leaf)))
}

/// Schema version attached to every emitted value (spec.md §4.5).
pub const SCHEMA_VERSION: u32 = 1;

fn leaf_matches(leaf: &SchemaLeaf, body: &[&str]) -> bool {
    leaf.segments.len() == body.len()
        && leaf.segments.iter().zip(body.iter()).all(|(seg, token)| match seg {
            Segment::Literal(s) => s == token,
            Segment::Dynamic(_) => true,
        })
}

/// Finds the one static leaf a requested body path resolves against,
/// within `group`'s leaves (spec.md §4.5 step 5 "walk the static body
/// path").
#[must_use]
pub fn find_leaf<'a>(leaves: &'a [SchemaLeaf], group: QueryGroup, body: &[&str]) -> Option<&'a SchemaLeaf> {
    leaves.iter().filter(|l| l.group == group).find(|l| leaf_matches(l, body))
}

pub type LabelMap = BTreeMap<String, String>;

/// Extracts `spec/labels/*` entries directly, since they live on
/// `Specification` rather than `Statistics` (spec.md §3).
pub fn extract_labels(labels: &LabelMap, requested: &[&str]) -> Result<Vec<(String, Value)>> {
    // `requested` is the full body (`spec/labels/<key>/value`); the
    // dynamic label key sits at index 2.
    let requested_token = requested.get(2).copied().unwrap_or("*");
    let entries: Vec<(&String, &String)> = if requested_token == "*" {
        labels.iter().collect()
    } else {
        match labels.get_key_value(requested_token) {
            Some(kv) => vec![kv],
            None => {
                return Err(CollectorError::UnknownDynamicValue {
                    name: requested_token.to_owned(),
                    reason: "unknown label key".to_owned(),
                })
            },
        }
    };
    Ok(entries.into_iter().map(|(k, v)| (format!("spec/labels/{}/value", k), Value::Str(v.clone()))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dynamic_leaf_is_preceded_by_a_table_key() {
        for leaf in body_schema() {
            if let Some(pos) = leaf.segments.iter().position(|s| matches!(s, Segment::Dynamic(_))) {
                assert!(pos > 0, "dynamic segment must not be the first segment");
            }
        }
    }

    #[test]
    fn per_cpu_index_out_of_range_fails() {
        let mut stats = Statistics::default();
        stats.cgroups.cpu_stats.cpu_usage.per_cpu = vec![1, 2, 3, 4];
        let leaf = dynamic_leaf("cgroups/cpu_stats/cpu_usage/per_cpu", CPU_ID, "value", QueryGroup::CpuUsage);
        let err = extract(&stats, &leaf, &["cgroups", "cpu_stats", "cpu_usage", "per_cpu", "100", "value"]).unwrap_err();
        assert!(matches!(err, CollectorError::UnknownDynamicValue { .. }));
    }

    #[test]
    fn per_cpu_wildcard_expands_to_every_cpu() {
        let mut stats = Statistics::default();
        stats.cgroups.cpu_stats.cpu_usage.per_cpu = vec![10, 20, 30, 40];
        let leaf = dynamic_leaf("cgroups/cpu_stats/cpu_usage/per_cpu", CPU_ID, "value", QueryGroup::CpuUsage);
        let resolved =
            extract(&stats, &leaf, &["cgroups", "cpu_stats", "cpu_usage", "per_cpu", "*", "value"]).unwrap();
        assert_eq!(resolved.len(), 4);
        assert!(resolved.iter().all(|(name, _)| !name.contains('*')));
    }

    #[test]
    fn find_leaf_matches_dynamic_position_by_arity() {
        let leaves = body_schema();
        let body = ["cgroups", "cpu_stats", "cpu_usage", "per_cpu", "3", "value"];
        let leaf = find_leaf(&leaves, QueryGroup::CpuUsage, &body).unwrap();
        assert!(has_dynamic(leaf));
    }

    #[test]
    fn memory_statistics_leaf_reads_named_key() {
        let mut stats = Statistics::default();
        stats.cgroups.memory_stats.statistics.insert("rss".to_owned(), 555);
        let leaf = leaf("cgroups/memory_stats/statistics/rss", QueryGroup::Statistics);
        let resolved = extract(&stats, &leaf, &[]).unwrap();
        assert_eq!(resolved, vec![("cgroups/memory_stats/statistics/rss".to_owned(), Value::UInt(555))]);
    }

    #[test]
    fn blkio_extracts_named_recursive_array_by_device() {
        use crate::model::BlkioEntry;

        let mut stats = Statistics::default();
        stats.cgroups.blkio_stats.io_serviced_recursive =
            vec![BlkioEntry { major: 8, minor: 0, op: None, value: 42 }];
        let leaf = body_schema()
            .into_iter()
            .find(|l| {
                l.group == QueryGroup::BlkioStats
                    && matches!(l.segments.get(2), Some(Segment::Literal("io_serviced_recursive")))
            })
            .unwrap();
        let resolved = extract(&stats, &leaf, &["cgroups", "blkio_stats", "io_serviced_recursive", "0", "value"])
            .unwrap();
        assert_eq!(
            resolved,
            vec![("cgroups/blkio_stats/io_serviced_recursive/0/value".to_owned(), Value::UInt(42))]
        );
    }

    #[test]
    fn blkio_unknown_array_name_is_rejected() {
        let leaf = SchemaLeaf {
            segments: vec![
                Segment::Literal("cgroups"),
                Segment::Literal("blkio_stats"),
                Segment::Literal("bogus_recursive"),
                Segment::Dynamic(DEVICE_NAME),
                Segment::Literal("value"),
            ],
            group: QueryGroup::BlkioStats,
        };
        let stats = Statistics::default();
        let err =
            extract(&stats, &leaf, &["cgroups", "blkio_stats", "bogus_recursive", "0", "value"]).unwrap_err();
        assert!(matches!(err, CollectorError::UnknownDynamicElement(_)));
    }

    #[test]
    fn label_extraction_keeps_spec_prefix() {
        let mut labels = LabelMap::new();
        labels.insert("env".to_owned(), "prod".to_owned());
        let resolved = extract_labels(&labels, &["spec", "labels", "env", "value"]).unwrap();
        assert_eq!(resolved, vec![("spec/labels/env/value".to_owned(), Value::Str("prod".to_owned()))]);
    }

    #[test]
    fn label_wildcard_expands_every_key() {
        let mut labels = LabelMap::new();
        labels.insert("env".to_owned(), "prod".to_owned());
        labels.insert("team".to_owned(), "core".to_owned());
        let resolved = extract_labels(&labels, &["spec", "labels", "*", "value"]).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|(name, _)| name.starts_with("spec/labels/")));
    }
}
