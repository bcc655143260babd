//! The `Repository` contract: whatever backend executes SQL and owns the
//! bookkeeping tables, abstracted away from the engine (spec §4.4).
//!
//! Mirrors the shape of `pgorm::client::GenericClient` — one trait, one
//! async method per operation — but keyed to migration bookkeeping instead
//! of generic row access, and generic over the concrete backend's error type
//! instead of being tied to `tokio_postgres`.

use std::future::Future;

/// One row to upsert into `migration_service_logs`.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub service_name: String,
    pub service_priority: i32,
    pub file_version: i32,
    pub file_name: String,
    pub sql: String,
    pub hash: String,
}

/// The natural key of a `migration_service_logs` row, for hash lookups.
#[derive(Debug, Clone)]
pub struct LogKey<'a> {
    pub service_name: &'a str,
    pub service_priority: i32,
    pub file_version: i32,
    pub file_name: &'a str,
}

/// Executes parameterless SQL and owns the two bookkeeping tables.
///
/// Implementations MUST:
/// - return `0` from `get_service_version` when no row exists for `name`;
/// - auto-create the relevant bookkeeping table and retry exactly once when
///   a query fails because the table doesn't exist (SQLSTATE `42P01`);
/// - run each `exec` call inside its own transaction (no cross-file
///   transactions — see spec §4.4 / §9).
pub trait Repository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_service_version(&self, name: &str) -> impl Future<Output = Result<i32, Self::Error>> + Send;

    fn update_service_version(
        &self,
        name: &str,
        version: i32,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Executes `sql` inside its own transaction. A failure rolls back only this statement.
    fn exec(&self, sql: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn write_migration_service_log(
        &self,
        record: LogRecord,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the recorded hash, or an empty string if no row matches `key`.
    fn get_hash_from_migration_service_log(
        &self,
        key: LogKey<'_>,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    fn create_migration_table(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// An in-memory [`Repository`] used by `fleetmig-core`'s own tests so the
/// engine's orchestration logic (ordering, idempotence, hash comparison,
/// force/fake semantics) can be exercised without a live Postgres instance.
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::{LogKey, LogRecord, Repository};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use thiserror::Error;

    /// The error [`MockRepository::exec`] returns when asked to fail, via
    /// [`MockRepository::fail_when_containing`]. Lets tests exercise the engine's
    /// non-`allow_error` abort path and its `allow_error` recovery path without a
    /// real database.
    #[derive(Debug, Error)]
    #[error("mock failure: statement contains {0:?}")]
    pub struct MockError(pub String);

    #[derive(Default)]
    pub struct MockRepository {
        versions: Mutex<HashMap<String, i32>>,
        logs: Mutex<HashMap<(String, i32, i32, String), (String, String)>>,
        pub executed: Mutex<Vec<String>>,
        fail_on: Mutex<Option<String>>,
    }

    impl MockRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_version(self, service: &str, version: i32) -> Self {
            self.versions
                .lock()
                .unwrap()
                .insert(service.to_string(), version);
            self
        }

        pub fn version_of(&self, service: &str) -> i32 {
            *self.versions.lock().unwrap().get(service).unwrap_or(&0)
        }

        pub fn log_count(&self) -> usize {
            self.logs.lock().unwrap().len()
        }

        /// Makes `exec` fail whenever the SQL contains `needle`.
        pub fn fail_when_containing(&self, needle: &str) {
            *self.fail_on.lock().unwrap() = Some(needle.to_string());
        }
    }

    impl Repository for MockRepository {
        type Error = MockError;

        async fn get_service_version(&self, name: &str) -> Result<i32, MockError> {
            Ok(self.version_of(name))
        }

        async fn update_service_version(&self, name: &str, version: i32) -> Result<(), MockError> {
            self.versions
                .lock()
                .unwrap()
                .insert(name.to_string(), version);
            Ok(())
        }

        async fn exec(&self, sql: &str) -> Result<(), MockError> {
            if let Some(needle) = self.fail_on.lock().unwrap().as_ref() {
                if sql.contains(needle.as_str()) {
                    return Err(MockError(needle.clone()));
                }
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn write_migration_service_log(&self, record: LogRecord) -> Result<(), MockError> {
            self.logs.lock().unwrap().insert(
                (
                    record.service_name,
                    record.service_priority,
                    record.file_version,
                    record.file_name,
                ),
                (record.sql, record.hash),
            );
            Ok(())
        }

        async fn get_hash_from_migration_service_log(
            &self,
            key: LogKey<'_>,
        ) -> Result<String, MockError> {
            let logs = self.logs.lock().unwrap();
            Ok(logs
                .get(&(
                    key.service_name.to_string(),
                    key.service_priority,
                    key.file_version,
                    key.file_name.to_string(),
                ))
                .map(|(_, hash)| hash.clone())
                .unwrap_or_default())
        }

        async fn create_migration_table(&self) -> Result<(), MockError> {
            Ok(())
        }
    }
}
