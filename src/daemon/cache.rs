//! Per-client inspection cache: full container id -> last inspection
//! result, kept for the lifetime of the `DaemonClient` (spec.md §3
//! "Ownership").

use std::collections::HashMap;
use std::sync::Mutex;

/// Daemon-side details about one container that don't change across a
/// process's lifetime: pid, image, name, storage driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub pid: u32,
    pub image: String,
    pub name: String,
    pub driver: String,
    pub full_id: String,
}

#[derive(Debug, Default)]
pub struct InspectionCache {
    entries: Mutex<HashMap<String, Inspection>>,
}

impl InspectionCache {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the cached inspection for `full_id`, if any.
    #[must_use]
    pub fn get(&self, full_id: &str) -> Option<Inspection> {
        self.entries.lock().expect("inspection cache lock poisoned").get(full_id).cloned()
    }

    /// Memoizes an inspection result for `full_id`.
    pub fn insert(&self, full_id: String, inspection: Inspection) {
        self.entries.lock().expect("inspection cache lock poisoned").insert(full_id, inspection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memoizes_by_full_id() {
        let cache = InspectionCache::new();
        assert!(cache.get("abc").is_none());
        cache.insert("abc".to_owned(), Inspection {
            pid: 123,
            image: "alpine".into(),
            name: "my-container".into(),
            driver: "overlay2".into(),
            full_id: "abc".into(),
        });
        assert_eq!(cache.get("abc").unwrap().pid, 123);
    }
}
