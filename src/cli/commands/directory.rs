//! Directory command implementations.
//!
//! Directory imports can be large, so they run on the import worker with
//! progress on stderr. Either filter narrows the import to known IDs; when
//! both are given only IDs in both are kept.

use crate::cli::commands::import::{print_report, run_on_worker};
use crate::cli::commands::{existing_db_path, open_storage, print_json};
use crate::cli::{DirectoryCommands, DirectoryFilter};
use crate::codec::radioid::parse_last_heard;
use crate::codec::{Dialect, Entity};
use crate::config::{batch_size, directory_feed_url, resolve_actor};
use crate::error::Result;
use crate::model::DirectoryContact;
use crate::storage::SqliteStorage;
use crate::transfer::file::read_member;
use crate::transfer::{ImportOptions, ImportSource};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct LookupOutput {
    entries: Vec<DirectoryContact>,
    count: usize,
}

#[derive(Serialize)]
struct CountOutput {
    live: usize,
    deleted: usize,
}

/// Execute directory commands.
///
/// # Errors
///
/// Returns an error if the database is missing, a filter cannot be read,
/// the download fails, or an entry does not exist.
pub fn execute(
    command: &DirectoryCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        DirectoryCommands::Import { path, filter } => {
            import(ImportSource::Path(path.clone()), filter, db_path, actor, json)
        }
        DirectoryCommands::Download { url, filter } => {
            let url = url.clone().unwrap_or_else(directory_feed_url);
            import(ImportSource::Url(url), filter, db_path, actor, json)
        }
        DirectoryCommands::Lookup { query, limit } => lookup(query, *limit, db_path, json),
        DirectoryCommands::Delete { dmr_id } => delete(*dmr_id, db_path, actor, json),
        DirectoryCommands::Count => count(db_path, json),
    }
}

/// Build the allow set from `--last-heard` and `--allow-list`.
fn allow_set(storage: &SqliteStorage, filter: &DirectoryFilter) -> Result<Option<HashSet<i64>>> {
    let heard = filter
        .last_heard
        .as_deref()
        .map(|path: &Path| read_member(path).map(|table| parse_last_heard(&table)))
        .transpose()?;
    let stored = filter
        .allow_list
        .as_deref()
        .map(|name| storage.allow_list(name))
        .transpose()?;

    Ok(match (heard, stored) {
        (Some(heard), Some(stored)) => Some(heard.intersection(&stored).copied().collect()),
        (heard, stored) => heard.or(stored),
    })
}

fn import(
    source: ImportSource,
    filter: &DirectoryFilter,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let db_path = existing_db_path(db_path)?;
    let allow = allow_set(&SqliteStorage::open(&db_path)?, filter)?;
    if let Some(allow) = &allow {
        info!(ids = allow.len(), "Filtering directory import");
    }

    let options = ImportOptions {
        dialect: Some(Dialect::RadioId),
        entity: Some(Entity::DigitalContacts),
        batch_size: batch_size(),
        allow,
        actor: resolve_actor(actor),
        ..ImportOptions::default()
    };
    let report = run_on_worker(db_path, source, options, json)?;
    print_report(&report, json)
}

fn print_entry(entry: &DirectoryContact) {
    let place: Vec<&str> = [&entry.city, &entry.state, &entry.country]
        .into_iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    println!(
        "{:>9}  {:<10} {:<28} {}",
        entry.dmr_id,
        entry.callsign.bold(),
        entry.name,
        place.join(", ").dimmed()
    );
}

fn lookup(query: &str, limit: usize, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;

    let entries = match query.trim().parse::<i64>() {
        Ok(dmr_id) => vec![storage.lookup_directory(dmr_id)?],
        Err(_) => storage.search_directory(query.trim(), limit)?,
    };

    if crate::is_csv() {
        println!("dmr_id,callsign,name,city,state,country");
        for e in &entries {
            println!(
                "{},{},{},{},{},{}",
                e.dmr_id,
                crate::csv_escape(&e.callsign),
                crate::csv_escape(&e.name),
                crate::csv_escape(&e.city),
                crate::csv_escape(&e.state),
                crate::csv_escape(&e.country)
            );
        }
    } else if json {
        print_json(&LookupOutput {
            count: entries.len(),
            entries,
        })?;
    } else if entries.is_empty() {
        println!("No directory entries match '{query}'.");
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }
    Ok(())
}

fn delete(dmr_id: i64, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    storage.delete_directory(dmr_id, &actor)?;

    if json {
        let output = serde_json::json!({ "dmr_id": dmr_id, "deleted": true });
        println!("{output}");
    } else {
        println!("Deleted directory entry: {dmr_id}");
    }
    Ok(())
}

fn count(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let summary = storage.status_summary()?;

    if json {
        print_json(&CountOutput {
            live: summary.directory_entries,
            deleted: summary.directory_deleted,
        })?;
    } else {
        println!(
            "{} entries ({} deleted)",
            summary.directory_entries, summary.directory_deleted
        );
    }
    Ok(())
}
