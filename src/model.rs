//! The statistics data model (spec.md §3): everything a single container
//! (or the synthetic `root` host entry) can expose.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The 34 raw kernel `memory.stat` keys plus the derived `working_set`
/// key, in the exact set the upstream plugin pre-populates
/// (`original_source/container/statistics.go:listOfMemoryStats`).
pub const MEMORY_STAT_KEYS: &[&str] = &[
    "active_anon",
    "active_file",
    "inactive_anon",
    "inactive_file",
    "cache",
    "dirty",
    "swap",
    "hierarchical_memory_limit",
    "hierarchical_memsw_limit",
    "mapped_file",
    "pgfault",
    "pgmajfault",
    "pgpgin",
    "pgpgout",
    "rss",
    "rss_huge",
    "total_active_anon",
    "total_active_file",
    "total_cache",
    "total_dirty",
    "total_inactive_anon",
    "total_inactive_file",
    "total_mapped_file",
    "total_pgfault",
    "total_pgmajfault",
    "total_pgpgin",
    "total_pgpgout",
    "total_rss",
    "total_rss_huge",
    "total_swap",
    "total_unevictable",
    "total_writeback",
    "unevictable",
    "working_set",
    "writeback",
];

/// Short id used for the synthetic host entry; exempt from the 12-char
/// rule (spec.md §9 open question (b)).
pub const ROOT_ID: &str = "root";
pub const ROOT_FULL_ID: &str = "/";

/// A live container or the synthetic host entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerEntry {
    pub short_id: String,
    pub full_id: String,
    pub spec: Specification,
    pub stats: Statistics,
}

impl ContainerEntry {
    #[must_use]
    pub fn is_root(&self) -> bool { self.short_id == ROOT_ID }

    /// Builds the synthetic `root` entry representing the host.
    #[must_use]
    pub fn root() -> Self {
        Self {
            short_id: ROOT_ID.to_owned(),
            full_id: ROOT_FULL_ID.to_owned(),
            spec: Specification::default(),
            stats: Statistics::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Specification {
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub image: String,
    pub size_rw: u64,
    pub size_root_fs: u64,
    pub labels: BTreeMap<String, String>,
}

impl Specification {
    /// Renders `created` in the stable ISO-8601 form spec.md §3 asks for.
    #[must_use]
    pub fn created_rfc3339(&self) -> Option<String> { self.created.map(|c| c.to_rfc3339()) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub cgroups: Cgroups,
    pub network: Vec<NetworkInterface>,
    pub connection: Connection,
    pub filesystem: BTreeMap<String, FilesystemInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cgroups {
    pub cpu_stats: CpuStats,
    pub memory_stats: MemoryStats,
    pub blkio_stats: BlkioStats,
    pub hugetlb_stats: BTreeMap<String, HugetlbStats>,
    pub pids_stats: PidsStats,
    pub cpuset_stats: CpuSetStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuStats {
    pub cpu_usage: CpuUsage,
    pub throttling_data: ThrottlingData,
    pub cpu_shares: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub total: u64,
    pub user_mode: u64,
    pub kernel_mode: u64,
    pub per_cpu: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThrottlingData {
    pub nr_periods: u64,
    pub nr_throttled: u64,
    pub throttled_time: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryData {
    pub usage: u64,
    pub max_usage: u64,
    pub failcnt: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub cache: u64,
    pub usage: MemoryData,
    pub swap_usage: MemoryData,
    pub kernel_usage: MemoryData,
    pub statistics: BTreeMap<String, u64>,
}

impl Default for MemoryStats {
    fn default() -> Self {
        let statistics = MEMORY_STAT_KEYS.iter().map(|&k| (k.to_owned(), 0)).collect();
        Self {
            cache: 0,
            usage: MemoryData::default(),
            swap_usage: MemoryData::default(),
            kernel_usage: MemoryData::default(),
            statistics,
        }
    }
}

impl MemoryStats {
    /// Recomputes the derived `working_set` key per spec.md §3's
    /// invariant: `max(0, usage.usage - total_inactive_anon -
    /// total_inactive_file)`, treating missing components as zero.
    pub fn recompute_working_set(&mut self) {
        let inactive_anon = *self.statistics.get("total_inactive_anon").unwrap_or(&0);
        let inactive_file = *self.statistics.get("total_inactive_file").unwrap_or(&0);
        let working_set = self
            .usage
            .usage
            .saturating_sub(inactive_anon)
            .saturating_sub(inactive_file);
        self.statistics.insert("working_set".to_owned(), working_set);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlkioOp {
    Read,
    Write,
    Sync,
    Async,
    Total,
    Discard,
}

impl BlkioOp {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Read" => Some(Self::Read),
            "Write" => Some(Self::Write),
            "Sync" => Some(Self::Sync),
            "Async" => Some(Self::Async),
            "Total" => Some(Self::Total),
            "Discard" => Some(Self::Discard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlkioEntry {
    pub major: u64,
    pub minor: u64,
    pub op: Option<BlkioOp>,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlkioStats {
    pub sectors_recursive: Vec<BlkioEntry>,
    pub io_service_bytes_recursive: Vec<BlkioEntry>,
    pub io_serviced_recursive: Vec<BlkioEntry>,
    pub io_queue_recursive: Vec<BlkioEntry>,
    pub io_service_time_recursive: Vec<BlkioEntry>,
    pub io_wait_time_recursive: Vec<BlkioEntry>,
    pub io_merged_recursive: Vec<BlkioEntry>,
    pub io_time_recursive: Vec<BlkioEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HugetlbStats {
    pub usage: u64,
    pub max_usage: u64,
    pub failcnt: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PidsStats {
    pub current: u64,
    /// 0 means "max" (unlimited).
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuSetStats {
    pub cpus: String,
    pub mems: String,
    pub memory_migrate: u64,
    pub cpu_exclusive: u64,
    pub memory_exclusive: u64,
}

pub const TOTAL_INTERFACE_NAME: &str = "total";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
}

impl NetworkInterface {
    fn add_assign(&mut self, other: &Self) {
        self.rx_bytes += other.rx_bytes;
        self.rx_packets += other.rx_packets;
        self.rx_errors += other.rx_errors;
        self.rx_dropped += other.rx_dropped;
        self.tx_bytes += other.tx_bytes;
        self.tx_packets += other.tx_packets;
        self.tx_errors += other.tx_errors;
        self.tx_dropped += other.tx_dropped;
    }
}

/// Interface name prefixes excluded from both per-interface rows and the
/// `total` sum (spec.md §3 invariant), matched case-insensitively.
const IGNORED_INTERFACE_PREFIXES: &[&str] = &["lo", "veth", "docker"];

#[must_use]
pub fn is_ignored_interface(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IGNORED_INTERFACE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Appends the synthetic `total` row, summing every preceding
/// non-ignored interface (spec.md §3 invariant).
pub fn append_total_row(interfaces: &mut Vec<NetworkInterface>) {
    let mut total = NetworkInterface {
        name: TOTAL_INTERFACE_NAME.to_owned(),
        ..Default::default()
    };
    for iface in interfaces.iter() {
        total.add_assign(iface);
    }
    interfaces.push(total);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Connection {
    pub tcp: TcpStat,
    pub tcp6: TcpStat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TcpStat {
    pub established: u64,
    pub syn_sent: u64,
    pub syn_recv: u64,
    pub fin_wait1: u64,
    pub fin_wait2: u64,
    pub time_wait: u64,
    pub close: u64,
    pub close_wait: u64,
    pub last_ack: u64,
    pub listen: u64,
    pub closing: u64,
}

impl TcpStat {
    /// Increments the counter for the given two-hex-digit `/proc/net/tcp*`
    /// state code (spec.md §4.2.11).
    pub fn increment(&mut self, state_hex: &str) -> bool {
        match state_hex.to_ascii_uppercase().as_str() {
            "01" => self.established += 1,
            "02" => self.syn_sent += 1,
            "03" => self.syn_recv += 1,
            "04" => self.fin_wait1 += 1,
            "05" => self.fin_wait2 += 1,
            "06" => self.time_wait += 1,
            "07" => self.close += 1,
            "08" => self.close_wait += 1,
            "09" => self.last_ack += 1,
            "0A" => self.listen += 1,
            "0B" => self.closing += 1,
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilesystemType {
    Vfs,
    Devicemapper,
    Zfs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskStats {
    pub reads_completed: u64,
    pub reads_merged: u64,
    pub sectors_read: u64,
    pub read_time: u64,
    pub writes_completed: u64,
    pub writes_merged: u64,
    pub sectors_written: u64,
    pub write_time: u64,
    pub io_in_progress: u64,
    pub io_time: u64,
    pub weighted_io_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesystemInterface {
    pub device: String,
    pub r#type: FilesystemType,
    pub limit: u64,
    pub usage: u64,
    pub base_usage: u64,
    pub available: u64,
    pub inodes_free: u64,
    pub disk: DiskStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stats_default_has_all_keys() {
        let stats = MemoryStats::default();
        assert_eq!(stats.statistics.len(), MEMORY_STAT_KEYS.len());
        for key in MEMORY_STAT_KEYS {
            assert!(stats.statistics.contains_key(*key));
        }
    }

    #[test]
    fn working_set_invariant() {
        let mut stats = MemoryStats::default();
        stats.usage.usage = 1000;
        stats.statistics.insert("total_inactive_anon".to_owned(), 200);
        stats.statistics.insert("total_inactive_file".to_owned(), 300);
        stats.recompute_working_set();
        assert_eq!(stats.statistics["working_set"], 500);
    }

    #[test]
    fn working_set_floors_at_zero() {
        let mut stats = MemoryStats::default();
        stats.usage.usage = 10;
        stats.statistics.insert("total_inactive_anon".to_owned(), 200);
        stats.recompute_working_set();
        assert_eq!(stats.statistics["working_set"], 0);
    }

    #[test]
    fn ignores_lo_veth_docker_interfaces_case_insensitive() {
        assert!(is_ignored_interface("lo"));
        assert!(is_ignored_interface("veth1234"));
        assert!(is_ignored_interface("docker0"));
        assert!(is_ignored_interface("DOCKER0"));
        assert!(!is_ignored_interface("eth0"));
    }

    #[test]
    fn total_row_sums_preceding_interfaces() {
        let mut ifaces = vec![
            NetworkInterface { name: "eth0".into(), rx_bytes: 10, tx_bytes: 5, ..Default::default() },
            NetworkInterface { name: "eth1".into(), rx_bytes: 20, tx_bytes: 7, ..Default::default() },
        ];
        append_total_row(&mut ifaces);
        let total = ifaces.last().unwrap();
        assert_eq!(total.name, TOTAL_INTERFACE_NAME);
        assert_eq!(total.rx_bytes, 30);
        assert_eq!(total.tx_bytes, 12);
    }

    #[test]
    fn tcp_state_increments_known_codes() {
        let mut tcp = TcpStat::default();
        assert!(tcp.increment("0A"));
        assert_eq!(tcp.listen, 1);
        assert!(!tcp.increment("FF"));
    }

    #[test]
    fn root_entry_has_fixed_ids() {
        let root = ContainerEntry::root();
        assert_eq!(root.short_id, "root");
        assert_eq!(root.full_id, "/");
        assert!(root.is_root());
    }
}
