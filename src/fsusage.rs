//! Filesystem usage collector (spec.md §4.3): a process-wide,
//! mutex-guarded map from absolute path to size-in-kB, kept current by
//! two background workers. Background workers are plain `std::thread`
//! loops, matching the teacher's preference for bare threads over an
//! async runtime outside the Docker RPC boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::errors::{CollectorError, Result};
use crate::fs::Sizer;
use crate::shell::Shell;

const CYCLE_INTERVAL: Duration = Duration::from_secs(30);

/// Closed at process exit; background workers have no other shutdown
/// signal (spec.md §9 "background workers").
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn cancel(&self) {
        *self.cancelled.lock().expect("cancellation lock poisoned") = true;
        self.condvar.notify_all();
    }

    /// Sleeps for `CYCLE_INTERVAL` or returns early (`true`) if
    /// cancelled in the meantime.
    fn wait_or_cancelled(&self) -> bool {
        let guard = self.cancelled.lock().expect("cancellation lock poisoned");
        let (guard, _) = self.condvar.wait_timeout(guard, CYCLE_INTERVAL).expect("cancellation lock poisoned");
        *guard
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { *self.cancelled.lock().expect("cancellation lock poisoned") }
}

/// Process-wide filesystem usage map shared between the background
/// workers and the filesystem parser (spec.md §3 "ownership").
#[derive(Debug, Default, Clone)]
pub struct FilesystemUsage {
    sizes: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

impl FilesystemUsage {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Looks up a previously-sized path; `UsageUnknown` if no worker
    /// has sized it yet (spec.md §4.3).
    pub fn size_kb(&self, path: &Path) -> Result<u64> {
        self.sizes
            .lock()
            .expect("filesystem usage lock poisoned")
            .get(path)
            .copied()
            .ok_or_else(|| CollectorError::UsageUnknown(path.to_path_buf()))
    }

    fn record(&self, path: PathBuf, size_kb: u64) {
        self.sizes.lock().expect("filesystem usage lock poisoned").insert(path, size_kb);
    }

    /// Starts the two background workers described in spec.md §4.3:
    /// one over a fixed singleton list, one over a fixed expansion list
    /// whose immediate subdirectories are resized every cycle.
    pub fn spawn_workers(
        &self,
        sizer: Arc<dyn Sizer>,
        singletons: Vec<PathBuf>,
        expansions: Vec<PathBuf>,
        shell: Arc<Shell>,
        token: Arc<CancellationToken>,
    ) {
        let map = self.clone();
        let singleton_sizer = Arc::clone(&sizer);
        let singleton_shell = Arc::clone(&shell);
        let singleton_token = Arc::clone(&token);
        std::thread::spawn(move || {
            run_singleton_worker(&map, singleton_sizer.as_ref(), &singletons, &singleton_shell, &singleton_token);
        });

        let map = self.clone();
        std::thread::spawn(move || {
            run_expansion_worker(&map, sizer.as_ref(), &expansions, &shell, &token);
        });
    }
}

fn run_singleton_worker(
    map: &FilesystemUsage,
    sizer: &dyn Sizer,
    paths: &[PathBuf],
    shell: &Shell,
    token: &CancellationToken,
) {
    loop {
        for path in paths {
            match sizer.size_kb(path) {
                Ok(size_kb) => map.record(path.clone(), size_kb),
                Err(e) => shell.warn(format!("could not size {:?}: {}", path, e)),
            }
        }
        if token.wait_or_cancelled() {
            return;
        }
    }
}

fn run_expansion_worker(
    map: &FilesystemUsage,
    sizer: &dyn Sizer,
    parents: &[PathBuf],
    shell: &Shell,
    token: &CancellationToken,
) {
    loop {
        for parent in parents {
            let children = match std::fs::read_dir(parent) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    shell.warn(format!("could not enumerate {:?}: {}", parent, e));
                    continue;
                },
            };
            for entry in children.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                match sizer.size_kb(&entry.path()) {
                    Ok(size_kb) => map.record(entry.path(), size_kb),
                    Err(e) => shell.warn(format!("could not size {:?}: {}", entry.path(), e)),
                }
            }
        }
        if token.wait_or_cancelled() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Shell;
    use std::collections::HashMap as StdHashMap;

    struct FixedSizer(StdHashMap<PathBuf, u64>);

    impl Sizer for FixedSizer {
        fn size_kb(&self, path: &Path) -> Result<u64> {
            self.0.get(path).copied().ok_or_else(|| CollectorError::UsageUnknown(path.to_path_buf()))
        }
    }

    #[test]
    fn unsized_path_is_usage_unknown() {
        let usage = FilesystemUsage::new();
        let err = usage.size_kb(Path::new("/never/sized")).unwrap_err();
        assert!(matches!(err, CollectorError::UsageUnknown(_)));
    }

    #[test]
    fn singleton_worker_records_sizes_once_cancelled_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("data");
        std::fs::create_dir(&target).unwrap();

        let mut sizes = StdHashMap::new();
        sizes.insert(target.clone(), 42);
        let sizer: Arc<dyn Sizer> = Arc::new(FixedSizer(sizes));

        let usage = FilesystemUsage::new();
        let shell = Arc::new(Shell::new(crate::shell::Verbosity::Quiet));
        let token = CancellationToken::new();
        token.cancel();

        run_singleton_worker(&usage, sizer.as_ref(), &[target.clone()], &shell, &token);
        assert_eq!(usage.size_kb(&target).unwrap(), 42);
    }
}
