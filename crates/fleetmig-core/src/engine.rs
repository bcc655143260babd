//! Orchestrates scan → select → apply over a [`crate::repository::Repository`].
//!
//! `Engine<R>` owns one [`MigrationSet`] that every operation clears and
//! repopulates before working — the Set is cheap to rebuild and a run never
//! needs state left over from a previous invocation.

use crate::error::{Error, EngineResult};
use crate::migration::{file_name_of, Migration};
use crate::repository::{LogKey, LogRecord, Repository};
use crate::scanner;
use crate::set::MigrationSet;
use regex::Regex;
use std::path::{Path, PathBuf};

pub struct Engine<R: Repository> {
    repo: R,
    set: MigrationSet,
}

impl<R: Repository> Engine<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            set: MigrationSet::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Scans `dir`, then applies every pending migration for every known service, priority ascending.
    pub async fn apply_all(&self, dir: &Path, env_name: &str) -> EngineResult<usize, R::Error> {
        self.set.clear_data();
        scanner::scan_dir(dir, &self.set)?;

        let mut total = 0usize;
        for priority in self.set.priorities() {
            for service in self.set.services(priority) {
                let cur = self.resolve_current_version(&service, priority).await?;
                let (count, _) = self.apply(&service, priority, cur, cur, env_name).await?;
                total += count;
            }
        }
        Ok(total)
    }

    /// Scans `dir` and applies pending migrations for exactly one `service`. Returns `None`
    /// if the scanned tree holds no such service, letting the HTTP `/apply?service=` route
    /// answer 404 instead of silently applying nothing.
    pub async fn apply_service(
        &self,
        dir: &Path,
        service: &str,
        env_name: &str,
    ) -> EngineResult<Option<usize>, R::Error> {
        self.set.clear_data();
        scanner::scan_dir(dir, &self.set)?;

        if !self.set.service_exists(service) {
            return Ok(None);
        }

        let priority = self
            .set
            .priorities()
            .into_iter()
            .find(|&p| self.set.services(p).iter().any(|s| s == service))
            .expect("service_exists implies some priority holds it");

        let cur = self.resolve_current_version(service, priority).await?;
        let (count, _) = self.apply(service, priority, cur, cur, env_name).await?;
        Ok(Some(count))
    }

    /// Applies every migration for `service` with `file_version > min_version`, in ascending
    /// order. `cur_version` gates whether `ServiceRecord.version` advances for a given file
    /// (never lowered): see [`Self::force_apply`], which passes a `min_version` of `-1` but a
    /// `cur_version` equal to the actual recorded version so already-applied files can be
    /// re-run without regressing the bookkeeping column.
    pub async fn apply(
        &self,
        service: &str,
        priority: i32,
        min_version: i32,
        cur_version: i32,
        env_name: &str,
    ) -> EngineResult<(usize, i32), R::Error> {
        let pending = self.set.service_migrations(service, priority, min_version);
        let mut count = 0usize;
        let mut last_version = cur_version;

        for (version, migrations) in pending {
            for migration in migrations {
                if !self.env_allows(&migration, env_name) {
                    continue;
                }

                let file_name = file_name_of(&migration.path);
                match self.repo.exec(&migration.query).await {
                    Ok(()) => {}
                    Err(cause) if migration.allow_error => {
                        tracing::warn!(
                            service,
                            version,
                            file = %file_name,
                            error = %cause,
                            "migration failed but allow_error is set; continuing"
                        );
                    }
                    Err(cause) => {
                        return Err(Error::MigrationQueryFailed {
                            service: service.to_string(),
                            version,
                            file_name,
                            cause,
                        });
                    }
                }

                if cur_version < version {
                    self.repo
                        .update_service_version(service, version)
                        .await
                        .map_err(|source| Error::BookkeepingFailed {
                            service: service.to_string(),
                            version,
                            source,
                        })?;
                }

                self.repo
                    .write_migration_service_log(LogRecord {
                        service_name: service.to_string(),
                        service_priority: priority,
                        file_version: version,
                        file_name: file_name.clone(),
                        sql: migration.query.clone(),
                        hash: migration.hash.clone(),
                    })
                    .await
                    .map_err(|source| Error::BookkeepingFailed {
                        service: service.to_string(),
                        version,
                        source,
                    })?;

                tracing::info!(service, version, file = %file_name, "applied migration");
                count += 1;
                last_version = version;
            }
        }

        Ok((count, last_version))
    }

    /// Applies every migration found under `paths` regardless of recorded version, but never
    /// lowers `ServiceRecord.version` (only advances it — see `apply`'s `cur_version` gate).
    pub async fn force_apply(&self, paths: &[PathBuf], env_name: &str) -> EngineResult<usize, R::Error> {
        self.set.clear_data();
        self.scan_paths(paths)?;

        let mut total = 0usize;
        for priority in self.set.priorities() {
            for service in self.set.services(priority) {
                let cur = self.resolve_current_version(&service, priority).await?;
                let (count, _) = self.apply(&service, priority, -1, cur, env_name).await?;
                total += count;
            }
        }
        Ok(total)
    }

    /// Advances `ServiceRecord.version` to the highest `file_version` found under `paths`,
    /// for each service, without executing any SQL or writing any log row.
    pub async fn fake_apply(&self, paths: &[PathBuf]) -> EngineResult<(), R::Error> {
        self.set.clear_data();
        self.scan_paths(paths)?;

        for priority in self.set.priorities() {
            for service in self.set.services(priority) {
                let migrations = self.set.service_migrations(&service, priority, -1);
                let Some(&max_version) = migrations.keys().max() else {
                    continue;
                };

                let cur = self.resolve_current_version(&service, priority).await?;
                if max_version > cur {
                    self.repo
                        .update_service_version(&service, max_version)
                        .await
                        .map_err(|source| Error::BookkeepingFailed {
                            service: service.clone(),
                            version: max_version,
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Compares each scanned migration's hash against the recorded one. A missing log row
    /// counts as a mismatch.
    pub async fn check_migration_hash(
        &self,
        paths: &[PathBuf],
    ) -> EngineResult<(bool, Vec<PathBuf>), R::Error> {
        self.set.clear_data();
        self.scan_paths(paths)?;

        let mut differing = Vec::new();
        for priority in self.set.priorities() {
            for service in self.set.services(priority) {
                let migrations = self.set.service_migrations(&service, priority, -1);
                for (version, files) in migrations {
                    for migration in files {
                        let file_name = file_name_of(&migration.path);
                        let stored = self
                            .repo
                            .get_hash_from_migration_service_log(LogKey {
                                service_name: &service,
                                service_priority: priority,
                                file_version: version,
                                file_name: &file_name,
                            })
                            .await
                            .map_err(Error::Repository)?;

                        if stored != migration.hash {
                            differing.push(migration.path.clone());
                        }
                    }
                }
            }
        }

        Ok((differing.is_empty(), differing))
    }

    /// Runs [`Self::check_migration_hash`] and, if anything differs, force-applies exactly
    /// those paths.
    pub async fn check_and_apply_migrations(
        &self,
        paths: &[PathBuf],
        env_name: &str,
    ) -> EngineResult<usize, R::Error> {
        let (all_equal, differing) = self.check_migration_hash(paths).await?;
        if all_equal {
            return Ok(0);
        }
        self.force_apply(&differing, env_name).await
    }

    /// Concatenates the SQL of every pending migration for `service`, in apply order, without
    /// executing anything.
    pub async fn get_sql(&self, dir: &Path, service: &str) -> EngineResult<String, R::Error> {
        self.set.clear_data();
        scanner::scan_dir(dir, &self.set)?;

        let cur = self
            .repo
            .get_service_version(service)
            .await
            .map_err(|source| Error::VersionLookupFailed {
                service: service.to_string(),
                source,
            })?;

        let pending = self.set.service_migrations(service, -1, cur);
        let mut out = String::new();
        for (_, files) in pending {
            for migration in files {
                let trimmed = migration.query.trim();
                out.push_str(trimmed);
                if !trimmed.ends_with(';') {
                    out.push(';');
                }
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Creates the bookkeeping tables. Idempotent.
    pub async fn init(&self) -> EngineResult<(), R::Error> {
        self.repo
            .create_migration_table()
            .await
            .map_err(Error::Repository)
    }

    fn scan_paths(&self, paths: &[PathBuf]) -> Result<(), crate::error::ScanError> {
        for path in paths {
            if path.is_dir() {
                scanner::scan_dir(path, &self.set)?;
            } else {
                scanner::read_file(path, &self.set)?;
            }
        }
        Ok(())
    }

    /// `GetServiceVersion` for priority 0 or the bootstrap `migration` service tolerates a
    /// missing bookkeeping row (treated as version 0) since they may predate the bookkeeping
    /// tables; any other service propagates the failure.
    async fn resolve_current_version(&self, service: &str, priority: i32) -> EngineResult<i32, R::Error> {
        match self.repo.get_service_version(service).await {
            Ok(v) => Ok(v),
            Err(source) if priority > 0 && service != "migration" => Err(Error::VersionLookupFailed {
                service: service.to_string(),
                source,
            }),
            Err(_) => {
                tracing::warn!(service, priority, "tolerating missing service version as 0");
                Ok(0)
            }
        }
    }

    fn env_allows(&self, migration: &Migration, env_name: &str) -> bool {
        let Some(env_regex) = &migration.env_regex else {
            return true;
        };
        match Regex::new(&env_regex.pattern) {
            Ok(re) => re.is_match(env_name) == !env_regex.negated,
            Err(error) => {
                tracing::warn!(
                    pattern = %env_regex.pattern,
                    %error,
                    "invalid require_env regex; skipping migration"
                );
                false
            }
        }
    }
}
