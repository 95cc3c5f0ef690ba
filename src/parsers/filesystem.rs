//! Filesystem usage parser (spec.md §4.2.12): mount enumeration,
//! per-container root selection, and capacity/disk-stats reporting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::DaemonVersion;
use crate::errors::{CollectorError, Result};
use crate::fs::{devicemapper, statvfs};
use crate::model::{DiskStats, FilesystemInterface, FilesystemType, Statistics};
use crate::util;

/// Filesystem types retained during mount enumeration (spec.md
/// §4.2.12 "mount enumeration").
fn is_retained_fs_type(fstype: &str) -> bool {
    fstype.starts_with("ext") || matches!(fstype, "btrfs" | "xfs" | "zfs")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub source: String,
    pub mount_point: PathBuf,
    pub fstype: String,
    pub is_root: bool,
    pub major: u64,
    pub minor: u64,
}

/// Parses `/proc/self/mounts`-style lines: `source mount_point fstype
/// options dump pass`. Duplicate sources keep the first occurrence.
pub fn enumerate_mounts(content: &str) -> Vec<Partition> {
    let mut seen_sources = std::collections::HashSet::new();
    let mut partitions = Vec::new();
    for line in util::lines(content) {
        let fields = util::fields(line);
        if fields.len() < 3 {
            continue;
        }
        let (source, mount_point, fstype) = (fields[0], fields[1], fields[2]);
        if !is_retained_fs_type(fstype) || !seen_sources.insert(source.to_owned()) {
            continue;
        }
        let (major, minor) = device_numbers(Path::new(mount_point)).unwrap_or((0, 0));
        partitions.push(Partition {
            source: source.to_owned(),
            mount_point: PathBuf::from(mount_point),
            fstype: fstype.to_owned(),
            is_root: mount_point == "/",
            major,
            minor,
        });
    }
    partitions
}

#[cfg(target_os = "linux")]
fn device_numbers(path: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    let meta = std::fs::metadata(path).ok()?;
    let dev = meta.dev();
    Some((libc::major(dev) as u64, libc::minor(dev) as u64))
}

#[cfg(not(target_os = "linux"))]
fn device_numbers(_path: &Path) -> Option<(u64, u64)> { None }

/// Resolves the directory a container's filesystem metrics are rooted
/// at (spec.md §4.2.12 "per-container root choice").
fn container_root(
    container_id: &str,
    driver: &str,
    root_dir: &str,
    version: DaemonVersion,
) -> Result<PathBuf> {
    let layer_id = if version.at_least(1, 10) {
        let mount_id_path =
            Path::new(root_dir).join("image").join(driver).join("layerdb/mounts").join(container_id).join("mount-id");
        std::fs::read_to_string(&mount_id_path)?.trim().to_owned()
    } else {
        container_id.to_owned()
    };

    match driver {
        "aufs" => Ok(Path::new(root_dir).join("aufs/diff").join(layer_id)),
        "overlay" => Ok(Path::new(root_dir).join("overlay").join(layer_id)),
        other => Err(CollectorError::UnsupportedDriver(other.to_owned())),
    }
}

fn log_dir(root_dir: &str, container_id: &str) -> PathBuf { Path::new(root_dir).join("containers").join(container_id) }

/// `^(s|xv)d[a-z]+\d*|dm-\d+$` from spec.md §4.2.12, hand-rolled to
/// avoid a regex dependency the rest of the stack doesn't otherwise need.
fn matches_diskstats_device(name: &str) -> bool {
    if let Some(rest) = name.strip_prefix("dm-") {
        return !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
    }
    for prefix in ["sd", "xvd"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            let letters_end = rest.bytes().take_while(u8::is_ascii_lowercase).count();
            if letters_end == 0 {
                continue;
            }
            let digits = &rest[letters_end ..];
            if digits.bytes().all(|b| b.is_ascii_digit()) {
                return true;
            }
        }
    }
    false
}

/// Parses one `/proc/diskstats` line into its device name and 11
/// counters, keyed by (major, minor) so the filesystem parser can join
/// it against the enumerated partitions.
fn parse_diskstats(content: &str) -> BTreeMap<(u64, u64), (String, DiskStats)> {
    let mut out = BTreeMap::new();
    for line in util::lines(content) {
        let fields = util::fields(line);
        if fields.len() < 14 {
            continue;
        }
        let name = fields[2];
        if !matches_diskstats_device(name) {
            continue;
        }
        let major = util::parse_u64_str(fields[0]).unwrap_or(0);
        let minor = util::parse_u64_str(fields[1]).unwrap_or(0);
        let n = |i: usize| util::parse_u64_str(fields[i]).unwrap_or(0);
        let disk = DiskStats {
            reads_completed: n(3),
            reads_merged: n(4),
            sectors_read: n(5),
            read_time: n(6),
            writes_completed: n(7),
            writes_merged: n(8),
            sectors_written: n(9),
            write_time: n(10),
            io_in_progress: n(11),
            io_time: n(12),
            weighted_io_time: n(13),
        };
        out.insert((major, minor), (name.to_owned(), disk));
    }
    out
}

fn device_key(device_path: &str) -> String {
    match device_path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_owned(),
        _ => "unknown".to_owned(),
    }
}

/// No per-instance state: every dependency (sizer, dmsetup, zfs,
/// filesystem usage map, daemon version) comes from `Options`, since
/// `dispatch` builds every parser the same way (spec.md §9
/// "heterogeneous parser dispatch").
pub struct FilesystemParser;

fn capacity(partition: &Partition, opts: &super::Options) -> Result<(u64, u64)> {
    match partition.fstype.as_str() {
        "zfs" => {
            let usage = opts.zfs()?.usage(&partition.source)?;
            Ok((usage.total(), usage.available))
        },
        _ if partition.source.starts_with("/dev/mapper/") => {
            let dmsetup = opts.dmsetup()?;
            let (used, total) = dmsetup.status(&partition.source)?;
            let block_size = dmsetup.data_block_size(&partition.source)?;
            let free = total.saturating_sub(used);
            Ok((devicemapper::blocks_to_bytes(total, block_size), devicemapper::blocks_to_bytes(free, block_size)))
        },
        _ => {
            let usage = statvfs::statvfs(&partition.mount_point)?;
            Ok((usage.total, usage.available))
        },
    }
}

fn inodes_free(partition: &Partition) -> u64 {
    statvfs::statvfs(&partition.mount_point).map(|u| u.inodes_free).unwrap_or(0)
}

impl super::Parser for FilesystemParser {
    fn update(&self, stats: &mut Statistics, opts: &super::Options) -> Result<()> {
        let procfs = opts.procfs()?;
        let mounts_content = std::fs::read_to_string(procfs.join("self/mounts"))?;
        let diskstats_content = std::fs::read_to_string(procfs.join("diskstats"))?;

        let partitions = enumerate_mounts(&mounts_content);
        let diskstats = parse_diskstats(&diskstats_content);

        let base_usage = if opts.is_host {
            0
        } else {
            let root_dir = opts.root_dir()?;
            let container_id = opts.container_id()?;
            let driver = opts.container_drv()?;
            let root = container_root(container_id, driver, root_dir, opts.daemon_version()?)?;
            let log = log_dir(root_dir, container_id);

            let usage = opts.filesystem_usage()?;
            let root_kb = usage.size_kb(&root).unwrap_or(0);
            let log_kb = usage.size_kb(&log).unwrap_or(0);
            root_kb.saturating_add(log_kb).saturating_mul(1024)
        };

        let mut filesystems = BTreeMap::new();
        for partition in &partitions {
            let entry = match diskstats.get(&(partition.major, partition.minor)) {
                Some(entry) => entry,
                None => continue,
            };
            let (limit, available) = capacity(partition, opts)?;
            let fs_type = match partition.fstype.as_str() {
                "zfs" => FilesystemType::Zfs,
                _ if partition.source.starts_with("/dev/mapper/") => FilesystemType::Devicemapper,
                _ => FilesystemType::Vfs,
            };
            let device_name = device_key(&entry.0);
            filesystems.insert(device_name.clone(), FilesystemInterface {
                device: partition.source.clone(),
                r#type: fs_type,
                limit,
                usage: limit.saturating_sub(available),
                base_usage,
                available,
                inodes_free: inodes_free(partition),
                disk: entry.1.clone(),
            });
        }

        stats.filesystem = filesystems;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_only_known_fs_types() {
        assert!(is_retained_fs_type("ext4"));
        assert!(is_retained_fs_type("xfs"));
        assert!(is_retained_fs_type("btrfs"));
        assert!(is_retained_fs_type("zfs"));
        assert!(!is_retained_fs_type("tmpfs"));
        assert!(!is_retained_fs_type("proc"));
    }

    #[test]
    fn enumerate_mounts_dedupes_sources_and_tags_root() {
        let content = "\
/dev/sda1 / ext4 rw 0 0
/dev/sda1 /mnt/dup ext4 rw 0 0
tmpfs /tmp tmpfs rw 0 0
";
        let partitions = enumerate_mounts(content);
        assert_eq!(partitions.len(), 1);
        assert!(partitions[0].is_root);
    }

    #[test]
    fn diskstats_device_matcher_accepts_expected_forms() {
        assert!(matches_diskstats_device("sda"));
        assert!(matches_diskstats_device("sda1"));
        assert!(matches_diskstats_device("xvdf1"));
        assert!(matches_diskstats_device("dm-0"));
        assert!(!matches_diskstats_device("loop0"));
        assert!(!matches_diskstats_device("sr0"));
    }

    #[test]
    fn device_key_uses_last_path_segment_or_unknown() {
        assert_eq!(device_key("/dev/sda1"), "sda1");
        assert_eq!(device_key(""), "unknown");
    }

    #[test]
    fn parses_diskstats_line() {
        let content = "   8       1 sda1 100 0 200 10 50 0 300 20 0 30 40\n";
        let parsed = parse_diskstats(content);
        let (name, disk) = &parsed[&(8, 1)];
        assert_eq!(name, "sda1");
        assert_eq!(disk.reads_completed, 100);
        assert_eq!(disk.weighted_io_time, 40);
    }

    #[test]
    fn container_root_before_1_10_uses_container_id_as_layer() {
        let root = container_root("abc123", "overlay", "/var/lib/docker", DaemonVersion { major: 1, minor: 9 })
            .unwrap();
        assert_eq!(root, PathBuf::from("/var/lib/docker/overlay/abc123"));
    }

    #[test]
    fn unsupported_driver_fails() {
        let err =
            container_root("abc123", "btrfs", "/var/lib/docker", DaemonVersion { major: 1, minor: 9 }).unwrap_err();
        assert!(matches!(err, CollectorError::UnsupportedDriver(_)));
    }
}
