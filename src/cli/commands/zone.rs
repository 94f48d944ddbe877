//! Zone and scan list command implementations.
//!
//! Both are named collections of channels; the same handlers serve
//! `cpm zone` and `cpm scanlist` with a different [`CollectionKind`].

use crate::cli::commands::{open_storage, print_json};
use crate::cli::CollectionCommands;
use crate::config::resolve_actor;
use crate::error::Result;
use crate::model::{Collection, CollectionKind};
use crate::storage::SqliteStorage;
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Serialize)]
struct CollectionListOutput {
    kind: CollectionKind,
    items: Vec<CollectionItem>,
    count: usize,
}

#[derive(Serialize)]
struct CollectionItem {
    id: i64,
    name: String,
    members: usize,
}

#[derive(Serialize)]
struct CollectionShowOutput {
    #[serde(flatten)]
    collection: Collection,
    member_names: Vec<String>,
}

fn label(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Zone => "zone",
        CollectionKind::ScanList => "scan list",
        CollectionKind::RoamingZone => "roaming zone",
    }
}

/// Execute zone or scan list commands.
///
/// # Errors
///
/// Returns an error if the database is missing or the named collection
/// does not exist.
pub fn execute(
    kind: CollectionKind,
    command: &CollectionCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        CollectionCommands::List => list(kind, db_path, json),
        CollectionCommands::Show { name } => show(kind, name, db_path, json),
        CollectionCommands::Create { name } => create(kind, name, db_path, actor, json),
        CollectionCommands::Delete { name } => delete(kind, name, db_path, actor, json),
        CollectionCommands::Assign { name, ids, append } => {
            assign(kind, name, ids, *append, db_path, actor, json)
        }
    }
}

fn list(kind: CollectionKind, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let collections = storage.list_collections(kind)?;

    if crate::is_csv() {
        println!("id,name,members");
        for c in &collections {
            println!("{},{},{}", c.id, crate::csv_escape(&c.name), c.member_ids.len());
        }
    } else if json {
        let items: Vec<CollectionItem> = collections
            .iter()
            .map(|c| CollectionItem {
                id: c.id,
                name: c.name.clone(),
                members: c.member_ids.len(),
            })
            .collect();
        print_json(&CollectionListOutput {
            kind,
            count: items.len(),
            items,
        })?;
    } else if collections.is_empty() {
        println!("No {}s found.", label(kind));
    } else {
        for c in &collections {
            println!("{:<24} {} channels", c.name.bold(), c.member_ids.len());
        }
    }

    Ok(())
}

/// Channel names for `ids`, in order; unknown ids show as `#id`.
fn member_names(storage: &SqliteStorage, ids: &[i64]) -> Result<Vec<String>> {
    let by_id: HashMap<i64, String> = storage
        .list_channels()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    Ok(ids
        .iter()
        .map(|id| by_id.get(id).cloned().unwrap_or_else(|| format!("#{id}")))
        .collect())
}

fn show(kind: CollectionKind, name: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let collection = storage.get_collection(kind, name)?;
    let names = member_names(&storage, &collection.member_ids)?;

    if json {
        return print_json(&CollectionShowOutput {
            collection,
            member_names: names,
        });
    }

    println!("{} ({} channels)", collection.name.bold(), names.len());
    for (pos, (id, channel)) in collection.member_ids.iter().zip(&names).enumerate() {
        println!("  {:>3}. {channel} {}", pos + 1, format!("#{id}").dimmed());
    }
    Ok(())
}

fn create(
    kind: CollectionKind,
    name: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let id = storage.create_collection(kind, name, &actor)?;

    if json {
        let output = serde_json::json!({ "id": id, "name": name, "kind": kind });
        println!("{output}");
    } else {
        println!("Created {}: {name}", label(kind));
    }
    Ok(())
}

fn delete(
    kind: CollectionKind,
    name: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    storage.delete_collection(kind, name, &actor)?;

    if json {
        let output = serde_json::json!({ "name": name, "deleted": true });
        println!("{output}");
    } else {
        println!("Deleted {}: {name}", label(kind));
    }
    Ok(())
}

fn assign(
    kind: CollectionKind,
    name: &str,
    ids: &[i64],
    append: bool,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let count = storage.assign_members(kind, name, ids, append, &actor)?;

    if json {
        let output = serde_json::json!({ "name": name, "members": count, "appended": append });
        println!("{output}");
    } else if append {
        println!("Added {count} channels to {} {name}", label(kind));
    } else {
        println!("Set {} {name} to {count} channels", label(kind));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Channel;
    use tempfile::TempDir;

    #[test]
    fn test_scan_list_lifecycle() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        crate::cli::commands::init::execute(Some(&db), false, true).unwrap();
        let (a, b) = {
            let mut storage = SqliteStorage::open(&db).unwrap();
            let a = storage.create_channel(&Channel::new("A", 146.52, 146.52), "t").unwrap();
            let b = storage.create_channel(&Channel::new("B", 147.0, 147.6), "t").unwrap();
            (a, b)
        };
        let kind = CollectionKind::ScanList;

        create(kind, "Local", Some(&db), None, true).unwrap();
        assign(kind, "Local", &[a], false, Some(&db), None, true).unwrap();
        assign(kind, "Local", &[b], true, Some(&db), None, true).unwrap();

        let storage = SqliteStorage::open(&db).unwrap();
        let list = storage.get_collection(kind, "Local").unwrap();
        assert_eq!(member_names(&storage, &list.member_ids).unwrap(), vec!["A", "B"]);
        drop(storage);

        delete(kind, "Local", Some(&db), None, true).unwrap();
        assert!(show(kind, "Local", Some(&db), true).is_err());
    }
}
