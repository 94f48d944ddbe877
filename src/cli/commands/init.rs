//! Create the codeplug database.
//!
//! The database lives at `~/.codeplug/data/codeplug.db` unless `--db`,
//! `CPM_DB`, `CODEPLUG_DB` or `CPM_TEST_DB` say otherwise. Schema and
//! migrations are applied here so later commands can assume them.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    reinitialized: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `Error::AlreadyInitialized` if the database exists and `force`
/// is not set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or_else(|| {
        Error::Config("Could not determine the codeplug directory".to_string())
    })?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    if existed {
        remove_database(&db_path)?;
    }

    SqliteStorage::open(&db_path)?;

    if json {
        let output = InitOutput {
            database: db_path,
            reinitialized: existed,
        };
        let payload = serde_json::to_string(&output)?;
        println!("{payload}");
    } else {
        println!("Initialized codeplug database");
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: Run 'cpm import <file> --dialect auto' to load channels.");
    }

    Ok(())
}

/// Remove the database along with its WAL side files.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Channel;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database_with_schema() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested").join("codeplug.db");

        execute(Some(&db), false, true).unwrap();
        assert!(db.exists());

        let storage = SqliteStorage::open(&db).unwrap();
        assert!(storage.list_channels().unwrap().is_empty());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");

        assert!(execute(Some(&db), false, true).is_ok());
        let result = execute(Some(&db), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
    }

    #[test]
    fn test_init_force_starts_over() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        execute(Some(&db), false, true).unwrap();
        {
            let mut storage = SqliteStorage::open(&db).unwrap();
            storage
                .create_channel(&Channel::new("Simplex", 146.52, 146.52), "test")
                .unwrap();
        }

        execute(Some(&db), true, true).unwrap();
        let storage = SqliteStorage::open(&db).unwrap();
        assert!(storage.list_channels().unwrap().is_empty());
    }
}
