//! Resource-group mount point discovery by scanning
//! `/proc/self/mountinfo` and `/proc/<pid>/mountinfo` (spec.md §4.1, §6).

use std::path::{Path, PathBuf};

use crate::errors::{CollectorError, Result};

/// Scans `<procfs>/self/mountinfo`, returning the mount point (field 4) of
/// the line whose last comma-separated options field contains
/// `controller`.
pub fn find_cgroup_mount(procfs: &Path, controller: &str) -> Result<PathBuf> {
    let path = procfs.join("self/mountinfo");
    let content = std::fs::read_to_string(&path)?;
    find_in_mountinfo(&content, controller)
        .ok_or_else(|| CollectorError::MountNotFound { controller: controller.to_owned(), path })
}

/// Scans `<procfs>/<pid>/mountinfo` for the controller's mount line, and
/// returns `dirname(field[4]) / controller / field[3]` — the controller's
/// mount point as seen from the container's own mount namespace.
pub fn find_controller_mount(controller: &str, pid: u32, procfs: &Path) -> Result<PathBuf> {
    let path = procfs.join(pid.to_string()).join("mountinfo");
    let content = std::fs::read_to_string(&path)?;
    find_controller_relative(&content, controller)
        .ok_or_else(|| CollectorError::MountNotFound { controller: controller.to_owned(), path })
}

/// A single parsed `mountinfo` line's fields relevant to cgroup discovery.
struct MountLine<'a> {
    /// Field 3: root of the mount relative to the filesystem root.
    root: &'a str,
    /// Field 4: mount point.
    mount_point: &'a str,
    /// Super options / the last comma-delimited field, which for cgroup
    /// mounts lists the enabled controllers.
    options: &'a str,
}

fn parse_line(line: &str) -> Option<MountLine<'_>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return None;
    }
    // Fields beyond the separating "-" vary in count, but the super
    // options we need are always the final whitespace-delimited field.
    let options = fields.last().copied()?;
    Some(MountLine { root: fields[3], mount_point: fields[4], options })
}

fn line_has_controller(options: &str, controller: &str) -> bool {
    options.split(',').any(|opt| opt == controller)
}

fn find_in_mountinfo(content: &str, controller: &str) -> Option<PathBuf> {
    content
        .lines()
        .filter_map(parse_line)
        .find(|l| line_has_controller(l.options, controller))
        .map(|l| PathBuf::from(l.mount_point))
}

fn find_controller_relative(content: &str, controller: &str) -> Option<PathBuf> {
    content
        .lines()
        .filter_map(parse_line)
        .find(|l| line_has_controller(l.options, controller))
        .map(|l| {
            let mount_point = Path::new(l.mount_point);
            let parent = mount_point.parent().unwrap_or(mount_point);
            parent.join(controller).join(l.root.trim_start_matches('/'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
36 35 0:30 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:16 - cgroup cgroup rw,cpu,cpuacct
37 35 0:31 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:17 - cgroup cgroup rw,memory
38 35 0:32 /docker/abc123 /sys/fs/cgroup/blkio rw,relatime shared:18 - cgroup cgroup rw,blkio
";

    #[test]
    fn finds_mount_point_by_controller_option() {
        let found = find_in_mountinfo(SAMPLE, "memory").unwrap();
        assert_eq!(found, PathBuf::from("/sys/fs/cgroup/memory"));
    }

    #[test]
    fn missing_controller_returns_none() {
        assert!(find_in_mountinfo(SAMPLE, "pids").is_none());
    }

    #[test]
    fn controller_relative_joins_parent_controller_and_root() {
        let found = find_controller_relative(SAMPLE, "blkio").unwrap();
        assert_eq!(found, PathBuf::from("/sys/fs/cgroup/blkio/docker/abc123"));
    }

    #[test]
    fn find_cgroup_mount_reads_real_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("self")).unwrap();
        let mut f = std::fs::File::create(dir.path().join("self/mountinfo")).unwrap();
        write!(f, "{}", SAMPLE).unwrap();
        let mount = find_cgroup_mount(dir.path(), "cpuacct").unwrap();
        assert_eq!(mount, PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"));
    }

    #[test]
    fn find_cgroup_mount_missing_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("self")).unwrap();
        std::fs::write(dir.path().join("self/mountinfo"), SAMPLE).unwrap();
        let err = find_cgroup_mount(dir.path(), "nonexistent").unwrap_err();
        assert!(matches!(err, CollectorError::MountNotFound { .. }));
    }
}
