//! Thin interface to the container daemon (spec.md §4.1), backed by
//! `shiplift` the same way rAdvisor's own Docker provider
//! (`polling/providers/docker.rs`) blocks a `tokio_compat` runtime on
//! the async Docker API calls — `shiplift` 0.7 is built on the old
//! hyper 0.12/tokio 0.1 stack, so the compat runtime is what lets the
//! rest of the collector stay on plain `async`/`await`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use shiplift::{Docker, Uri};
use tokio_compat::runtime::Runtime;

use crate::config::{Config, DaemonVersion, VersionCell};
use crate::daemon::cache::{Inspection, InspectionCache};
use crate::daemon::mounts;
use crate::errors::{CollectorError, Result};
use crate::model::ContainerEntry;
use crate::shell::Shell;

/// Memoizes a global (not container-specific) cgroup mount point lookup
/// per controller, and a per-(controller, pid) namespace-relative lookup,
/// per spec.md §4.5 step 4's "two-level cache".
#[derive(Default)]
struct MountCache {
    global: Mutex<HashMap<String, PathBuf>>,
    per_pid: Mutex<HashMap<(String, u32), PathBuf>>,
}

pub struct DaemonClient {
    endpoint: String,
    docker: Docker,
    runtime: Runtime,
    inspection_cache: InspectionCache,
    mount_cache: MountCache,
    version: VersionCell,
    root_dir: Mutex<Option<String>>,
    storage_driver: Mutex<Option<String>>,
    shell: Arc<Shell>,
}

impl DaemonClient {
    /// Constructs a client without yet validating connectivity; call
    /// [`DaemonClient::initialize`] before issuing any other request.
    pub fn new(config: &Config, shell: Arc<Shell>) -> Result<Self> {
        let uri = Uri::from_str(&config.endpoint)
            .map_err(|e| CollectorError::DaemonUnavailable(format!("bad endpoint {:?}: {}", config.endpoint, e)))?;
        let runtime = Runtime::new().map_err(|e| CollectorError::Other(e.into()))?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            docker: Docker::host(uri),
            runtime,
            inspection_cache: InspectionCache::new(),
            mount_cache: MountCache::default(),
            version: VersionCell::new(),
            root_dir: Mutex::new(None),
            storage_driver: Mutex::new(None),
            shell,
        })
    }

    /// Pings the daemon and records its version, root storage directory,
    /// and storage driver (spec.md §4.1 "Initialization").
    pub fn initialize(&mut self) -> Result<()> {
        self.runtime
            .block_on(self.docker.ping())
            .map_err(|e| CollectorError::DaemonUnavailable(format!("could not reach {:?}: {}", self.endpoint, e)))?;

        let info = self
            .runtime
            .block_on(self.docker.info())
            .map_err(|e| CollectorError::DaemonUnavailable(format!("could not fetch daemon info: {}", e)))?;

        self.version.set(DaemonVersion::parse(&info.server_version));
        *self.root_dir.lock().expect("root dir lock poisoned") = Some(info.docker_root_dir.clone());
        *self.storage_driver.lock().expect("storage driver lock poisoned") = Some(info.driver.clone());

        self.shell.info(format!(
            "connected to docker daemon {:?} (version {:?}, driver {:?})",
            self.endpoint, self.version.get(), info.driver
        ));
        Ok(())
    }

    #[must_use]
    pub fn version(&self) -> DaemonVersion { self.version.get() }

    pub fn root_dir(&self) -> Result<String> {
        self.root_dir
            .lock()
            .expect("root dir lock poisoned")
            .clone()
            .ok_or_else(|| CollectorError::MissingDaemonInfo("root_dir".to_owned()))
    }

    pub fn storage_driver(&self) -> Result<String> {
        self.storage_driver
            .lock()
            .expect("storage driver lock poisoned")
            .clone()
            .ok_or_else(|| CollectorError::MissingDaemonInfo("storage_driver".to_owned()))
    }

    /// Looks up one or more daemon parameters by name, failing with
    /// `MissingDaemonInfo` if any requested name is absent (spec.md
    /// §4.1 `get_params`).
    pub fn get_params(&self, names: &[&str]) -> Result<HashMap<String, String>> {
        let mut out = HashMap::new();
        for &name in names {
            let value = match name {
                "root_dir" => self.root_dir()?,
                "storage_driver" => self.storage_driver()?,
                "endpoint" => self.endpoint.clone(),
                _ => return Err(CollectorError::MissingDaemonInfo(name.to_owned())),
            };
            out.insert(name.to_owned(), value);
        }
        Ok(out)
    }

    /// Rebuilds the live container map, including the synthetic `root`
    /// entry, at the start of a batch (spec.md §4.1, §4.5 step 2).
    pub fn list_containers(&self) -> Result<BTreeMap<String, ContainerEntry>> {
        let containers = self
            .runtime
            .block_on(self.docker.containers().list(&Default::default()))
            .map_err(|e| CollectorError::DaemonUnavailable(format!("could not list containers: {}", e)))?;

        let mut out = BTreeMap::new();
        for c in containers {
            let entry = match container_entry(&c) {
                Ok(entry) => entry,
                Err(err) => {
                    self.shell.warn(format!("skipping container {:?}: {}", c.id, err));
                    continue;
                },
            };
            out.insert(entry.short_id.clone(), entry);
        }
        out.insert(ContainerEntry::root().short_id, ContainerEntry::root());
        Ok(out)
    }

    /// Inspects one container by full id, memoizing the result for the
    /// lifetime of this client (spec.md §4.1 `inspect_container`).
    pub fn inspect_container(&self, full_id: &str) -> Result<Inspection> {
        if let Some(cached) = self.inspection_cache.get(full_id) {
            return Ok(cached);
        }

        let details = self
            .runtime
            .block_on(self.docker.containers().get(full_id).inspect())
            .map_err(|e| CollectorError::DaemonUnavailable(format!("could not inspect {:?}: {}", full_id, e)))?;

        let inspection = Inspection {
            pid: details.state.pid.max(0) as u32,
            image: details.image,
            name: details.name.trim_start_matches('/').to_owned(),
            driver: details.driver,
            full_id: details.id.clone(),
        };
        self.inspection_cache.insert(full_id.to_owned(), inspection.clone());
        Ok(inspection)
    }

    /// Finds the host mount point for `controller`, caching it globally
    /// for the lifetime of the client.
    pub fn find_cgroup_mount(&self, procfs: &Path, controller: &str) -> Result<PathBuf> {
        if let Some(cached) = self.mount_cache.global.lock().expect("mount cache lock poisoned").get(controller) {
            return Ok(cached.clone());
        }
        let mount = mounts::find_cgroup_mount(procfs, controller)?;
        self.mount_cache
            .global
            .lock()
            .expect("mount cache lock poisoned")
            .insert(controller.to_owned(), mount.clone());
        Ok(mount)
    }

    /// Finds `controller`'s mount point as seen from `pid`'s mount
    /// namespace, caching it per (controller, pid).
    pub fn find_controller_mount(&self, controller: &str, pid: u32, procfs: &Path) -> Result<PathBuf> {
        let key = (controller.to_owned(), pid);
        if let Some(cached) = self.mount_cache.per_pid.lock().expect("mount cache lock poisoned").get(&key) {
            return Ok(cached.clone());
        }
        let mount = mounts::find_controller_mount(controller, pid, procfs)?;
        self.mount_cache
            .per_pid
            .lock()
            .expect("mount cache lock poisoned")
            .insert(key, mount.clone());
        Ok(mount)
    }
}

/// Short id is the first 12 characters of the daemon-reported id;
/// `IdTooShort` if shorter (spec.md §4.1).
pub fn short_id(full_id: &str) -> Result<String> {
    if full_id.len() < 12 {
        return Err(CollectorError::IdTooShort(full_id.to_owned()));
    }
    Ok(full_id.chars().take(12).collect())
}

fn container_entry(c: &shiplift::rep::Container) -> Result<ContainerEntry> {
    use crate::model::Specification;

    let created = Utc.timestamp_opt(c.created, 0).single();
    let spec = Specification {
        status: c.status.clone(),
        created,
        image: c.image.clone(),
        size_rw: c.size_rw.unwrap_or(0).max(0) as u64,
        size_root_fs: c.size_root_fs.unwrap_or(0).max(0) as u64,
        labels: c.labels.clone().into_iter().collect(),
    };

    Ok(ContainerEntry {
        short_id: short_id(&c.id)?,
        full_id: c.id.clone(),
        spec,
        stats: crate::model::Statistics::default(),
    })
}
