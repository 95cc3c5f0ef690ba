//! Parsers: one per resource-group controller or procfs area (spec.md
//! §4.2), dispatched by query group (spec.md §4.4, §9 "heterogeneous
//! parser dispatch").

mod blkio;
mod cgroup_file;
mod cpu_shares;
mod cpuacct;
mod cpuset;
mod filesystem;
mod hugetlb;
mod memory;
mod network;
mod pids;
mod tcp;
mod throttling;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strum_macros::{Display, EnumString};

use crate::config::DaemonVersion;
use crate::errors::{CollectorError, Result};
use crate::fs::{DmSetup, Sizer, Zfs};
use crate::fsusage::FilesystemUsage;
use crate::model::Statistics;

/// Closed set of labels identifying which parser handles a request body
/// (spec.md §4.4 "query-group classification").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueryGroup {
    ThrottlingData,
    CpuUsage,
    CpuShares,
    Cache,
    Usage,
    SwapUsage,
    KernelUsage,
    Statistics,
    BlkioStats,
    HugetlbStats,
    PidsStats,
    #[strum(serialize = "cpuset_stats")]
    CpuSetStats,
    Network,
    Tcp,
    Tcp6,
    Filesystem,
    Spec,
}

/// The option bag every parser receives (spec.md §4.2): lookups are
/// typed, and a missing key the parser needs fails with `BadOption`.
#[derive(Clone, Default)]
pub struct Options {
    pub cgroup_path: Option<PathBuf>,
    pub procfs: Option<PathBuf>,
    pub pid: Option<u32>,
    pub is_host: bool,
    pub container_id: Option<String>,
    pub container_drv: Option<String>,
    pub root_dir: Option<String>,
    /// Filesystem-parser-only dependencies (spec.md §4.2.12); every
    /// other parser leaves these `None`.
    pub filesystem_usage: Option<FilesystemUsage>,
    pub sizer: Option<Arc<dyn Sizer>>,
    pub dmsetup: Option<Arc<dyn DmSetup>>,
    pub zfs: Option<Arc<dyn Zfs>>,
    pub daemon_version: Option<DaemonVersion>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("cgroup_path", &self.cgroup_path)
            .field("procfs", &self.procfs)
            .field("pid", &self.pid)
            .field("is_host", &self.is_host)
            .field("container_id", &self.container_id)
            .field("container_drv", &self.container_drv)
            .field("root_dir", &self.root_dir)
            .finish_non_exhaustive()
    }
}

impl Options {
    fn missing(key: &str) -> CollectorError {
        CollectorError::BadOption { key: key.to_owned(), reason: "missing".to_owned() }
    }

    pub fn cgroup_path(&self) -> Result<&Path> {
        self.cgroup_path.as_deref().ok_or_else(|| Self::missing("cgroup_path"))
    }

    pub fn procfs(&self) -> Result<&Path> { self.procfs.as_deref().ok_or_else(|| Self::missing("procfs")) }

    pub fn pid(&self) -> Result<u32> { self.pid.ok_or_else(|| Self::missing("pid")) }

    pub fn container_id(&self) -> Result<&str> {
        self.container_id.as_deref().ok_or_else(|| Self::missing("container_id"))
    }

    pub fn container_drv(&self) -> Result<&str> {
        self.container_drv.as_deref().ok_or_else(|| Self::missing("container_drv"))
    }

    pub fn root_dir(&self) -> Result<&str> { self.root_dir.as_deref().ok_or_else(|| Self::missing("root_dir")) }

    pub fn filesystem_usage(&self) -> Result<&FilesystemUsage> {
        self.filesystem_usage.as_ref().ok_or_else(|| Self::missing("filesystem_usage"))
    }

    pub fn sizer(&self) -> Result<&Arc<dyn Sizer>> { self.sizer.as_ref().ok_or_else(|| Self::missing("sizer")) }

    pub fn dmsetup(&self) -> Result<&Arc<dyn DmSetup>> {
        self.dmsetup.as_ref().ok_or_else(|| Self::missing("dmsetup"))
    }

    pub fn zfs(&self) -> Result<&Arc<dyn Zfs>> { self.zfs.as_ref().ok_or_else(|| Self::missing("zfs")) }

    pub fn daemon_version(&self) -> Result<DaemonVersion> {
        self.daemon_version.ok_or_else(|| Self::missing("daemon_version"))
    }
}

/// The single capability every parser implements (spec.md §9
/// "heterogeneous parser dispatch"): mutate `stats` in place from the
/// resource it owns, or fail.
pub trait Parser {
    fn update(&self, stats: &mut Statistics, opts: &Options) -> Result<()>;
}

/// Looks up the implementor for `group`. Tcp/Tcp6 share one struct
/// parameterized by file suffix, matching the design note that the two
/// variants differ only in which `net/tcp*` file they read.
#[must_use]
pub fn dispatch(group: QueryGroup) -> Box<dyn Parser> {
    match group {
        QueryGroup::ThrottlingData => Box::new(throttling::ThrottlingParser),
        QueryGroup::CpuUsage => Box::new(cpuacct::CpuAcctParser),
        QueryGroup::CpuShares => Box::new(cpu_shares::CpuSharesParser),
        QueryGroup::Cache => Box::new(memory::CacheParser),
        QueryGroup::Usage => Box::new(memory::UsageParser),
        QueryGroup::SwapUsage => Box::new(memory::SwapUsageParser),
        QueryGroup::KernelUsage => Box::new(memory::KernelUsageParser),
        QueryGroup::Statistics => Box::new(memory::StatisticsParser),
        QueryGroup::BlkioStats => Box::new(blkio::BlkioParser),
        QueryGroup::HugetlbStats => Box::new(hugetlb::HugetlbParser),
        QueryGroup::PidsStats => Box::new(pids::PidsParser),
        QueryGroup::CpuSetStats => Box::new(cpuset::CpuSetParser),
        QueryGroup::Network => Box::new(network::NetworkParser),
        QueryGroup::Tcp => Box::new(tcp::TcpParser::new(tcp::TcpVariant::V4)),
        QueryGroup::Tcp6 => Box::new(tcp::TcpParser::new(tcp::TcpVariant::V6)),
        QueryGroup::Filesystem => Box::new(filesystem::FilesystemParser),
        QueryGroup::Spec => Box::new(NoopParser),
    }
}

/// `spec` fields are populated directly from the daemon's container
/// listing (see `daemon::client::container_entry`), not by a resource
/// parser; dispatching to it is a no-op.
struct NoopParser;

impl Parser for NoopParser {
    fn update(&self, _stats: &mut Statistics, _opts: &Options) -> Result<()> { Ok(()) }
}
