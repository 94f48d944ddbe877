//! Allow list command implementations.

use crate::cli::commands::{open_storage, print_json};
use crate::cli::AllowListCommands;
use crate::codec::radioid::parse_filter_list;
use crate::config::resolve_actor;
use crate::error::Result;
use crate::model::AllowList;
use crate::transfer::file::{malformed, read_member};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct AllowListOutput {
    allow_lists: Vec<AllowList>,
    count: usize,
}

/// Execute allow list commands.
///
/// # Errors
///
/// Returns an error if the database is missing or the file has no ID column.
pub fn execute(
    command: &AllowListCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        AllowListCommands::Import { name, file } => import(name, file, db_path, actor, json),
        AllowListCommands::List => list(db_path, json),
    }
}

fn import(
    name: &str,
    file: &Path,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    let table = read_member(file)?;
    let ids = parse_filter_list(&table).map_err(|e| malformed(file, &e))?;
    let count = storage.import_allow_list(name, &ids, &actor)?;

    if json {
        let output = serde_json::json!({ "name": name, "entries": count });
        println!("{output}");
    } else {
        println!("Imported allow list {}: {count} IDs", name.bold());
    }
    Ok(())
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let lists = storage.list_allow_lists()?;

    if json {
        print_json(&AllowListOutput {
            count: lists.len(),
            allow_lists: lists,
        })?;
    } else if lists.is_empty() {
        println!("No allow lists found.");
    } else {
        for list in &lists {
            let updated = chrono::DateTime::from_timestamp_millis(list.updated_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{:<24} {:>8} IDs  {}",
                list.name.bold(),
                list.entry_count,
                updated.dimmed()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_import_replaces_list() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        crate::cli::commands::init::execute(Some(&db), false, true).unwrap();

        let first = dir.path().join("first.csv");
        fs::write(&first, "Radio ID,Callsign\n3100001,K1AA\n3100002,K1AB\n").unwrap();
        import("club", &first, Some(&db), None, true).unwrap();

        let second = dir.path().join("second.txt");
        fs::write(&second, "3100009\n3100010\n3100011\n").unwrap();
        import("club", &second, Some(&db), None, true).unwrap();

        let storage = SqliteStorage::open(&db).unwrap();
        let ids = storage.allow_list("club").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&3_100_009));
        assert_eq!(storage.list_allow_lists().unwrap().len(), 1);
    }

    #[test]
    fn test_import_without_id_column_is_malformed() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        crate::cli::commands::init::execute(Some(&db), false, true).unwrap();

        let file = dir.path().join("names.csv");
        fs::write(&file, "Callsign,Name\nK1AA,Ann\n").unwrap();
        let err = import("club", &file, Some(&db), None, true).unwrap_err();
        assert!(matches!(err, crate::error::Error::MalformedFile { .. }));
    }
}
