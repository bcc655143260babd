//! Walks a migration root and derives `(service_priority, service_name, file_version)`
//! from filesystem layout, populating a [`crate::set::MigrationSet`].

use crate::error::ScanError;
use crate::migration::{Migration, MigrationKey};
use crate::set::MigrationSet;
use std::path::{Path, PathBuf};

/// Populates `set` with every `.sql` file found recursively under `root`.
///
/// Non-`.sql` files (including `.yaml`/`.yml`, handled by the external
/// YAML-to-SQL conversion tool) are silently skipped.
pub fn scan_dir(root: &Path, set: &MigrationSet) -> Result<(), ScanError> {
    walk(root, set)
}

fn walk(dir: &Path, set: &MigrationSet) -> Result<(), ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ScanError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ScanError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            walk(&path, set)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        read_file(&path, set)?;
    }

    Ok(())
}

/// Applies the same path-to-key derivation as [`scan_dir`] to a single file.
/// Used by force/fake/check commands that accept explicit paths.
pub fn read_file(path: &Path, set: &MigrationSet) -> Result<(), ScanError> {
    if path.extension().and_then(|e| e.to_str()) != Some("sql") {
        return Ok(());
    }

    let key = derive_key(path)?;
    let contents = std::fs::read_to_string(path).map_err(|source| ScanError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let migration = Migration::new(path.to_path_buf(), contents);
    set.add(key, migration);
    Ok(())
}

fn derive_key(path: &Path) -> Result<MigrationKey, ScanError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::InvalidFileName(path.to_path_buf()))?;

    let file_version = parse_version_prefix(file_name)
        .ok_or_else(|| ScanError::InvalidFileName(path.to_path_buf()))?;

    let parent = path
        .parent()
        .ok_or_else(|| ScanError::InvalidDirectoryName(path.to_path_buf()))?;
    let parent_name = parent
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ScanError::InvalidDirectoryName(path.to_path_buf()))?;

    let (service_priority, service_name) = if parent_name.contains('_') {
        parse_service_dir(parent_name)
            .ok_or_else(|| ScanError::InvalidDirectoryName(parent.to_path_buf()))?
    } else {
        let grandparent = parent
            .parent()
            .ok_or_else(|| ScanError::InvalidDirectoryName(parent.to_path_buf()))?;
        let grandparent_name = grandparent
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ScanError::InvalidDirectoryName(grandparent.to_path_buf()))?;
        let (priority, name) = parse_service_dir(grandparent_name)
            .ok_or_else(|| ScanError::InvalidDirectoryName(grandparent.to_path_buf()))?;
        (priority, format!("{name}_{parent_name}"))
    };

    Ok(MigrationKey::new(service_priority, service_name, file_version))
}

/// `<file_version>_<arbitrary>.sql` — version is everything before the first `_`.
fn parse_version_prefix(file_name: &str) -> Option<i32> {
    let stem = file_name.strip_suffix(".sql")?;
    let (version_str, rest) = stem.split_once('_')?;
    if rest.is_empty() {
        return None;
    }
    version_str.parse::<i32>().ok().filter(|v| *v >= 0)
}

/// `<service_priority>_<service_name>` — name is everything after the first `_`.
fn parse_service_dir(dir_name: &str) -> Option<(i32, String)> {
    let (priority_str, name) = dir_name.split_once('_')?;
    if name.is_empty() {
        return None;
    }
    let priority = priority_str.parse::<i32>().ok()?;
    Some((priority, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fleetmig-scanner-test-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn derives_key_from_flat_service_dir() {
        let root = temp_dir("flat");
        fs::create_dir_all(root.join("01_user")).unwrap();
        fs::write(root.join("01_user/01_init.sql"), "CREATE TABLE users(id int);").unwrap();

        let set = MigrationSet::new();
        scan_dir(&root, &set).unwrap();

        assert!(set.service_exists("user"));
        let migs = set.service_migrations("user", -1, -1);
        assert!(migs.contains_key(&1));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn appends_subdir_name_to_service_when_parent_has_no_underscore() {
        let root = temp_dir("subgroup");
        fs::create_dir_all(root.join("01_user/seeds")).unwrap();
        fs::write(root.join("01_user/01_init.sql"), "CREATE TABLE users(id int);").unwrap();
        fs::write(root.join("01_user/seeds/02_seed.sql"), "INSERT INTO users VALUES (1);").unwrap();

        let set = MigrationSet::new();
        scan_dir(&root, &set).unwrap();

        assert!(set.service_exists("user"));
        assert!(set.service_exists("user_seeds"));
        let seeds = set.service_migrations("user_seeds", -1, -1);
        assert!(seeds.contains_key(&2));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn ignores_non_sql_files() {
        let root = temp_dir("nonsql");
        fs::create_dir_all(root.join("01_user")).unwrap();
        fs::write(root.join("01_user/01_init.sql"), "CREATE TABLE users(id int);").unwrap();
        fs::write(root.join("01_user/01_seed.yaml"), "- insert: users").unwrap();

        let set = MigrationSet::new();
        scan_dir(&root, &set).unwrap();

        let migs = set.service_migrations("user", -1, -1);
        assert_eq!(migs.len(), 1);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn rejects_invalid_file_name() {
        let root = temp_dir("badfile");
        fs::create_dir_all(root.join("01_user")).unwrap();
        fs::write(root.join("01_user/notaversion.sql"), "SELECT 1;").unwrap();

        let set = MigrationSet::new();
        let err = scan_dir(&root, &set).unwrap_err();
        assert!(matches!(err, ScanError::InvalidFileName(_)));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn rejects_invalid_directory_name() {
        let root = temp_dir("baddir");
        fs::create_dir_all(root.join("noservicepriority")).unwrap();
        fs::write(root.join("noservicepriority/01_init.sql"), "SELECT 1;").unwrap();

        let set = MigrationSet::new();
        let err = scan_dir(&root, &set).unwrap_err();
        assert!(matches!(err, ScanError::InvalidDirectoryName(_)));

        fs::remove_dir_all(&root).unwrap();
    }
}
