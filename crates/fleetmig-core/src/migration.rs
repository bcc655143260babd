//! A single migration file and its identity within a [`crate::set::MigrationSet`].

use std::path::PathBuf;

/// One `.sql` file discovered under the migration root.
///
/// `query` is the file's contents verbatim; `hash` is the MD5 hex digest of
/// those same bytes, used for drift detection in [`crate::engine::Engine::check_hash`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub path: PathBuf,
    pub query: String,
    pub hash: String,
    pub allow_error: bool,
    pub env_regex: Option<EnvRegex>,
}

/// A `require_env` directive: a regex plus whether it was negated with a leading `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRegex {
    pub pattern: String,
    pub negated: bool,
}

impl Migration {
    pub fn new(path: PathBuf, query: String) -> Self {
        let hash = format!("{:x}", md5::compute(query.as_bytes()));
        let (allow_error, env_regex) = crate::directive::parse(&query);
        Self {
            path,
            query,
            hash,
            allow_error,
            env_regex,
        }
    }
}

/// Identity of a migration within a set: `(service_priority, service_name, file_version)`.
/// Unique per migration within a [`crate::set::MigrationSet`] — produced by the scanner
/// from filesystem layout and consumed by [`crate::set::MigrationSet::add`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MigrationKey {
    pub service_priority: i32,
    pub service_name: String,
    pub file_version: i32,
}

impl MigrationKey {
    pub fn new(service_priority: i32, service_name: String, file_version: i32) -> Self {
        Self {
            service_priority,
            service_name,
            file_version,
        }
    }
}

/// File name (without directory) used as the final column of the unique
/// key on `migration_service_logs`.
pub fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_md5_of_exact_bytes() {
        let m = Migration::new(PathBuf::from("01_init.sql"), "SELECT 1;".to_string());
        assert_eq!(m.hash, format!("{:x}", md5::compute(b"SELECT 1;")));
    }

    #[test]
    fn allow_error_defaults_false_without_directive() {
        let m = Migration::new(PathBuf::from("01_init.sql"), "CREATE TABLE t (id int);".to_string());
        assert!(!m.allow_error);
        assert!(m.env_regex.is_none());
    }
}
