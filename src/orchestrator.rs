//! Collection orchestrator (spec.md §4.5, §4.6): the two-state
//! (`Uninitialized`/`Ready`) driver that turns a batch of requested
//! metric names into resolved values.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::daemon::DaemonClient;
use crate::errors::{CollectorError, Result};
use crate::fs::{DmSetup, Sizer, Zfs};
use crate::fsusage::FilesystemUsage;
use crate::model::{ContainerEntry, Specification};
use crate::parsers::{self, QueryGroup};
use crate::resolver::{self, ExpandedName};
use crate::schema::{self, SchemaLeaf, Value};
use crate::shell::Shell;
use crate::util;

/// One emitted metric (spec.md §4.5): a fully resolved name, the
/// timestamp it was read at, its typed value, and the schema version.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub name: String,
    pub timestamp_ms: u128,
    pub value: Value,
    pub schema_version: u32,
}

/// Dependencies the filesystem parser needs, held independently of
/// client state so they survive a client reset (spec.md §4.6).
struct FilesystemDeps {
    usage: FilesystemUsage,
    sizer: Arc<dyn Sizer>,
    dmsetup: Arc<dyn DmSetup>,
    zfs: Arc<dyn Zfs>,
}

/// Owns the two-state machine described in spec.md §4.6: no client
/// (`Uninitialized`) or a validated client plus caches (`Ready`).
pub struct Orchestrator {
    config: Config,
    shell: Arc<Shell>,
    client: Option<DaemonClient>,
    fs_deps: FilesystemDeps,
    leaves: Vec<SchemaLeaf>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: Config,
        shell: Arc<Shell>,
        usage: FilesystemUsage,
        sizer: Arc<dyn Sizer>,
        dmsetup: Arc<dyn DmSetup>,
        zfs: Arc<dyn Zfs>,
    ) -> Self {
        Self {
            config,
            shell,
            client: None,
            fs_deps: FilesystemDeps { usage, sizer, dmsetup, zfs },
            leaves: schema::body_schema(),
        }
    }

    /// Emits the full static template set (spec.md §4.5
    /// `list_metric_names`), each body prefixed by the generic
    /// container wildcard.
    #[must_use]
    pub fn list_metric_names(&self) -> Vec<String> {
        self.leaves
            .iter()
            .map(|leaf| format!("intel/docker/*/{}", schema::template_body(leaf)))
            .collect()
    }

    /// Ensures the client is constructed and validated, constructing it
    /// if absent (spec.md §4.5 step 1). A failed init leaves the client
    /// unset, so the next call retries from `Uninitialized`.
    fn ensure_ready(&mut self) -> Result<&DaemonClient> {
        if self.client.is_none() {
            let mut client = DaemonClient::new(&self.config, Arc::clone(&self.shell))?;
            client.initialize().map_err(|e| {
                self.shell.error(format!("daemon initialization failed: {}", e));
                e
            })?;
            self.client = Some(client);
        }
        Ok(self.client.as_ref().expect("just ensured"))
    }

    /// Runs one full batch (spec.md §4.5).
    pub fn collect(&mut self, requests: &[String]) -> Result<Vec<MetricValue>> {
        let result = self.collect_inner(requests);
        if let Err(CollectorError::DaemonUnavailable(_)) = &result {
            self.client = None;
        }
        result
    }

    fn collect_inner(&mut self, requests: &[String]) -> Result<Vec<MetricValue>> {
        self.ensure_ready()?;
        let client = self.client.as_ref().expect("ensure_ready sets client");

        let mut containers = client.list_containers()?;
        let live_ids: Vec<String> = containers.keys().cloned().collect();
        let expanded = resolver::expand(requests, &live_ids)?;

        let procfs = PathBuf::from(&self.config.procfs);
        let grouped = resolver::group_by_container(&expanded);
        for (container_id, groups) in &grouped {
            for &group in groups {
                // Build options against an immutable snapshot of the
                // entry first, since `build_options` only needs to read
                // identity/spec fields, not the stats being filled in.
                let entry = match containers.get(container_id) {
                    Some(entry) => entry.clone(),
                    None => return Err(CollectorError::UnknownContainer(container_id.clone())),
                };
                let opts = match build_options(client, &procfs, &entry, group, &self.fs_deps) {
                    Ok(opts) => opts,
                    Err(e) => {
                        self.shell.warn(format!("could not prepare options for {:?}/{:?}: {}", container_id, group, e));
                        continue;
                    },
                };
                let parser = parsers::dispatch(group);
                let stats = &mut containers.get_mut(container_id).expect("checked above").stats;
                // Parser errors are logged and swallowed: fields keep
                // their prior (zeroed) values (spec.md §7).
                if let Err(e) = parser.update(stats, &opts) {
                    self.shell.warn(format!("parser {:?} failed for {:?}: {}", group, container_id, e));
                }
            }
        }

        let values = reproject(&expanded, &containers, &self.leaves)?;
        if values.is_empty() {
            return Err(CollectorError::NoMetrics);
        }
        Ok(values)
    }
}

/// Maps a query group to the cgroup controller whose mount point it
/// needs (spec.md §4.2); procfs-rooted and filesystem groups need none.
fn controller_for(group: QueryGroup) -> Option<&'static str> {
    match group {
        QueryGroup::ThrottlingData | QueryGroup::CpuShares => Some("cpu"),
        QueryGroup::CpuUsage => Some("cpuacct"),
        QueryGroup::Cache | QueryGroup::Usage | QueryGroup::SwapUsage | QueryGroup::KernelUsage |
        QueryGroup::Statistics => Some("memory"),
        QueryGroup::BlkioStats => Some("blkio"),
        QueryGroup::HugetlbStats => Some("hugetlb"),
        QueryGroup::PidsStats => Some("pids"),
        QueryGroup::CpuSetStats => Some("cpuset"),
        QueryGroup::Network | QueryGroup::Tcp | QueryGroup::Tcp6 | QueryGroup::Filesystem | QueryGroup::Spec => None,
    }
}

fn build_options(
    client: &DaemonClient,
    procfs: &Path,
    entry: &ContainerEntry,
    group: QueryGroup,
    deps: &FilesystemDeps,
) -> Result<parsers::Options> {
    let is_host = entry.is_root();
    let mut opts = parsers::Options { procfs: Some(procfs.to_path_buf()), is_host, ..Default::default() };

    let inspection = if is_host { None } else { Some(client.inspect_container(&entry.full_id)?) };

    if let Some(controller) = controller_for(group) {
        let cgroup_path = match &inspection {
            None => client.find_cgroup_mount(procfs, controller)?,
            Some(inspection) => client.find_controller_mount(controller, inspection.pid, procfs)?,
        };
        opts.cgroup_path = Some(cgroup_path);
    }

    if matches!(group, QueryGroup::Network | QueryGroup::Tcp | QueryGroup::Tcp6) {
        if let Some(inspection) = &inspection {
            opts.pid = Some(inspection.pid);
        }
    }

    if group == QueryGroup::Filesystem {
        opts.filesystem_usage = Some(deps.usage.clone());
        opts.sizer = Some(Arc::clone(&deps.sizer));
        opts.dmsetup = Some(Arc::clone(&deps.dmsetup));
        opts.zfs = Some(Arc::clone(&deps.zfs));
        opts.daemon_version = Some(client.version());
        if let Some(inspection) = &inspection {
            opts.container_id = Some(entry.full_id.clone());
            opts.container_drv = Some(inspection.driver.clone());
            opts.root_dir = Some(client.root_dir()?);
        }
    }

    Ok(opts)
}

fn reproject(
    expanded: &[ExpandedName],
    containers: &std::collections::BTreeMap<String, ContainerEntry>,
    leaves: &[SchemaLeaf],
) -> Result<Vec<MetricValue>> {
    let mut out = Vec::new();
    let now = util::milli_ts();

    for name in expanded {
        let entry = match containers.get(&name.container_id) {
            Some(entry) => entry,
            None => return Err(CollectorError::UnknownContainer(name.container_id.clone())),
        };

        // Two exclusions (spec.md §4.5 step 6).
        if entry.is_root() && matches!(name.group, QueryGroup::Spec | QueryGroup::PidsStats) {
            continue;
        }

        let body: Vec<&str> = name.body.iter().map(String::as_str).collect();
        let resolved = if name.group == QueryGroup::Spec {
            reproject_spec(&entry.spec, &body)?
        } else {
            let leaf = schema::find_leaf(leaves, name.group, &body)
                .ok_or_else(|| CollectorError::UnroutedMetric(name.original.clone()))?;
            schema::extract(&entry.stats, leaf, &body)?
        };

        for (suffix, value) in resolved {
            out.push(MetricValue {
                name: format!("intel/docker/{}/{}", name.container_id, suffix),
                timestamp_ms: now,
                value,
                schema_version: schema::SCHEMA_VERSION,
            });
        }
    }

    Ok(out)
}

/// `spec/*` fields live on `Specification`, not `Statistics` (spec.md
/// §3); `spec/labels/*` is the one dynamic case.
fn reproject_spec(spec: &Specification, body: &[&str]) -> Result<Vec<(String, Value)>> {
    match body {
        ["spec", "labels", ..] => schema::extract_labels(&spec.labels, body),
        ["spec", "status"] => Ok(vec![("spec/status".to_owned(), Value::Str(spec.status.clone()))]),
        ["spec", "created"] => {
            Ok(vec![("spec/created".to_owned(), Value::Str(spec.created_rfc3339().unwrap_or_default()))])
        },
        ["spec", "image"] => Ok(vec![("spec/image".to_owned(), Value::Str(spec.image.clone()))]),
        ["spec", "size_rw"] => Ok(vec![("spec/size_rw".to_owned(), Value::UInt(spec.size_rw))]),
        ["spec", "size_root_fs"] => Ok(vec![("spec/size_root_fs".to_owned(), Value::UInt(spec.size_root_fs))]),
        other => Err(CollectorError::UnroutedMetric(other.join("/"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_mapping_covers_every_cgroup_group() {
        assert_eq!(controller_for(QueryGroup::ThrottlingData), Some("cpu"));
        assert_eq!(controller_for(QueryGroup::CpuUsage), Some("cpuacct"));
        assert_eq!(controller_for(QueryGroup::Statistics), Some("memory"));
        assert_eq!(controller_for(QueryGroup::Network), None);
        assert_eq!(controller_for(QueryGroup::Filesystem), None);
    }

    #[test]
    fn spec_scalar_fields_resolve_directly() {
        let spec = Specification { status: "running".to_owned(), image: "alpine".to_owned(), ..Default::default() };
        let resolved = reproject_spec(&spec, &["spec", "status"]).unwrap();
        assert_eq!(resolved, vec![("spec/status".to_owned(), Value::Str("running".to_owned()))]);
    }

    #[test]
    fn list_metric_names_is_nonempty_and_prefixed() {
        let leaves = schema::body_schema();
        let names: Vec<String> =
            leaves.iter().map(|leaf| format!("intel/docker/*/{}", schema::template_body(leaf))).collect();
        assert!(!names.is_empty());
        assert!(names.iter().all(|n| n.starts_with("intel/docker/*/")));
    }
}
