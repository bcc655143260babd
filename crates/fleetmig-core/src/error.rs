//! Error types for the migration engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while walking the filesystem and deriving migration keys
/// from paths. Carries no repository dependency, so it is concrete rather
/// than generic.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The migration root (or a directory reached while scanning it) could not be read.
    #[error("cannot read directory {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `.sql` file could not be opened or read.
    #[error("cannot read file {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file name did not match `<file_version>_<name>.sql`.
    #[error("invalid migration file name: {0}")]
    InvalidFileName(PathBuf),

    /// A directory name did not match `<service_priority>_<service_name>`.
    #[error("invalid service directory name: {0}")]
    InvalidDirectoryName(PathBuf),
}

/// Result type alias for engine operations, generic over the repository's own error type.
pub type EngineResult<T, E> = Result<T, Error<E>>;

/// Errors raised by the engine, generic over `E`, the error type of whatever
/// [`crate::repository::Repository`] implementation is plugged in (e.g.
/// `fleetmig-db`'s `DbError`, or the in-memory mock used in tests) so this
/// crate never needs to know about `tokio_postgres`.
#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + 'static> {
    /// Scanning the migration tree failed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// `Repository::get_service_version` failed for a priority/service combination
    /// that is not tolerant of a missing bookkeeping row.
    #[error("failed to look up service version for {service}: {source}")]
    VersionLookupFailed { service: String, source: E },

    /// A migration's SQL failed and `allow_error` was not set.
    #[error("migration {file_name} (version {version}) for service {service} failed: {cause}")]
    MigrationQueryFailed {
        service: String,
        version: i32,
        file_name: String,
        #[source]
        cause: E,
    },

    /// Writing `ServiceRecord` or `MigrationLog` failed after a migration's SQL
    /// already committed — a correctness-critical condition, since a later run
    /// would otherwise re-apply already-executed SQL.
    #[error("failed to record bookkeeping for {service} version {version}: {source}")]
    BookkeepingFailed {
        service: String,
        version: i32,
        #[source]
        source: E,
    },

    /// Opaque passthrough for repository errors that don't fit a more specific variant
    /// (e.g. a connection failure unrelated to version lookups or writes).
    #[error("repository error: {0}")]
    Repository(#[source] E),
}
