//! The in-memory migration index: `priority → service → version → [Migration]`.
//!
//! Mutated under a single coarse lock shared by all readers and writers —
//! acceptable because one invocation runs one pass at a time (see the
//! Engine's concurrency model).

use crate::migration::{Migration, MigrationKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

type VersionMap = BTreeMap<i32, Vec<Migration>>;
type ServiceMap = HashMap<String, VersionMap>;
type PriorityMap = BTreeMap<i32, ServiceMap>;

#[derive(Default)]
pub struct MigrationSet {
    data: Mutex<PriorityMap>,
}

impl MigrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the set to empty. Makes the scanner re-runnable within one process.
    pub fn clear_data(&self) {
        self.data.lock().unwrap().clear();
    }

    /// Inserts a migration under its [`MigrationKey`]. A duplicate `(service, priority,
    /// version)` is not a hard error — it accumulates into the version's list — but is
    /// surprising enough to warrant a log line, since it usually means two files share a
    /// version prefix by mistake.
    pub fn add(&self, key: MigrationKey, migration: Migration) {
        let MigrationKey {
            service_priority: priority,
            service_name: service,
            file_version: version,
        } = key;

        let mut data = self.data.lock().unwrap();
        let services = data.entry(priority).or_default();
        let versions = services.entry(service.clone()).or_default();
        let bucket = versions.entry(version).or_default();
        if !bucket.is_empty() {
            tracing::warn!(
                service,
                priority,
                version,
                "duplicate (service, priority, version); accumulating migrations for this key"
            );
        }
        bucket.push(migration);
    }

    pub fn service_exists(&self, name: &str) -> bool {
        let data = self.data.lock().unwrap();
        data.values().any(|services| services.contains_key(name))
    }

    /// Services at one priority, or (priority = -1) the union across all priorities.
    pub fn services(&self, priority: i32) -> Vec<String> {
        let data = self.data.lock().unwrap();
        let mut out = Vec::new();
        match priority {
            -1 => {
                for services in data.values() {
                    out.extend(services.keys().cloned());
                }
            }
            p => {
                if let Some(services) = data.get(&p) {
                    out.extend(services.keys().cloned());
                }
            }
        }
        out
    }

    /// Sorted ascending list of priorities present in the set.
    pub fn priorities(&self) -> Vec<i32> {
        let data = self.data.lock().unwrap();
        data.keys().copied().collect()
    }

    /// `file_version → [Migration]` for the named service, filtered to
    /// `file_version > min_version`. If `priority == -1`, merges across all priorities.
    pub fn service_migrations(
        &self,
        name: &str,
        priority: i32,
        min_version: i32,
    ) -> BTreeMap<i32, Vec<Migration>> {
        let data = self.data.lock().unwrap();
        let mut out: BTreeMap<i32, Vec<Migration>> = BTreeMap::new();

        let priorities: Vec<i32> = match priority {
            -1 => data.keys().copied().collect(),
            p => vec![p],
        };

        for p in priorities {
            let Some(services) = data.get(&p) else {
                continue;
            };
            let Some(versions) = services.get(name) else {
                continue;
            };
            for (&version, migs) in versions {
                if version <= min_version {
                    continue;
                }
                out.entry(version).or_default().extend(migs.iter().cloned());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn mig(sql: &str) -> Migration {
        Migration::new(PathBuf::from("x.sql"), sql.to_string())
    }

    fn key(service: &str, priority: i32, version: i32) -> MigrationKey {
        MigrationKey::new(priority, service.to_string(), version)
    }

    #[test]
    fn priorities_are_sorted_ascending() {
        let set = MigrationSet::new();
        set.add(key("b", 2, 1), mig("SELECT 1;"));
        set.add(key("a", 1, 1), mig("SELECT 1;"));
        assert_eq!(set.priorities(), vec![1, 2]);
    }

    #[test]
    fn service_migrations_filters_by_min_version() {
        let set = MigrationSet::new();
        set.add(key("user", 1, 1), mig("SELECT 1;"));
        set.add(key("user", 1, 2), mig("SELECT 2;"));
        set.add(key("user", 1, 3), mig("SELECT 3;"));

        let pending = set.service_migrations("user", 1, 1);
        assert_eq!(pending.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn service_migrations_merges_across_priorities_when_asked() {
        let set = MigrationSet::new();
        set.add(key("shared", 1, 1), mig("SELECT 1;"));
        set.add(key("shared", 2, 1), mig("SELECT 2;"));

        let merged = set.service_migrations("shared", -1, 0);
        assert_eq!(merged.get(&1).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_key_accumulates_instead_of_erroring() {
        let set = MigrationSet::new();
        set.add(key("user", 1, 1), mig("SELECT 1;"));
        set.add(key("user", 1, 1), mig("SELECT 2;"));

        let migs = set.service_migrations("user", 1, 0);
        assert_eq!(migs.get(&1).unwrap().len(), 2);
    }

    #[test]
    fn clear_data_empties_the_set() {
        let set = MigrationSet::new();
        set.add(key("user", 1, 1), mig("SELECT 1;"));
        set.clear_data();
        assert!(!set.service_exists("user"));
        assert!(set.priorities().is_empty());
    }

    #[test]
    fn services_minus_one_unions_across_priorities() {
        let set = MigrationSet::new();
        set.add(key("a", 1, 1), mig("SELECT 1;"));
        set.add(key("b", 2, 1), mig("SELECT 1;"));
        let mut all = set.services(-1);
        all.sort();
        assert_eq!(all, vec!["a".to_string(), "b".to_string()]);
    }
}
