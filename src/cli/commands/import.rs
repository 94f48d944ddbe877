//! Import command implementation.
//!
//! Single files are imported inline. Archive directories and directory feeds
//! run on the import worker while this thread prints its progress snapshots.

use crate::cli::commands::{existing_db_path, parse_dialect, parse_entity, print_json};
use crate::cli::ImportArgs;
use crate::config::{batch_size, resolve_actor};
use crate::error::Result;
use crate::storage::SqliteStorage;
use crate::transfer::{
    spawn_import, ChannelSink, ImportMode, ImportOptions, ImportReport, ImportSource, Importer,
    JobStatus, LogSink, ProgressSnapshot,
};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::mpsc;

/// Row errors shown per member before the rest are summarized.
const MAX_ERRORS_SHOWN: usize = 10;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error for an unknown dialect or entity, a missing database,
/// or a failed import.
pub fn execute(
    args: &ImportArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let db_path = existing_db_path(db_path)?;
    let options = ImportOptions {
        dialect: parse_dialect(&args.dialect)?,
        entity: parse_entity(args.entity.as_deref())?,
        mode: if args.replace {
            ImportMode::Replace
        } else {
            ImportMode::Merge
        },
        zone: args.zone.clone(),
        batch_size: batch_size(),
        allow: None,
        actor: resolve_actor(actor),
    };

    let source = ImportSource::Path(args.path.clone());
    let report = if args.path.is_dir() {
        run_on_worker(db_path, source, options, json)?
    } else {
        let mut storage = SqliteStorage::open(&db_path)?;
        Importer::new(&mut storage, &options, &LogSink).run(&source)?
    };

    print_report(&report, json)
}

/// Run an import on the worker thread, echoing progress to stderr.
pub(crate) fn run_on_worker(
    db_path: PathBuf,
    source: ImportSource,
    options: ImportOptions,
    json: bool,
) -> Result<ImportReport> {
    let (tx, rx) = mpsc::channel::<ProgressSnapshot>();
    let job = spawn_import(db_path, source, options, Box::new(ChannelSink(tx)))?;

    // The sender lives in the worker, so this ends when the worker does.
    for snapshot in rx {
        if !json {
            print_progress(&snapshot);
        }
    }
    job.join()
}

fn print_progress(snapshot: &ProgressSnapshot) {
    let status = match snapshot.status {
        JobStatus::Error => snapshot.status.as_str().red(),
        JobStatus::Completed => snapshot.status.as_str().green(),
        _ => snapshot.status.as_str().dimmed(),
    };
    if snapshot.total > 0 {
        eprintln!(
            "[{}/{}] {status} {}",
            snapshot.processed, snapshot.total, snapshot.message
        );
    } else {
        eprintln!("{status} {}", snapshot.message);
    }
}

/// Print an import report as JSON or a per-member summary.
pub(crate) fn print_report(report: &ImportReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    if report.members.is_empty() {
        println!("Nothing imported.");
    }
    for member in &report.members {
        let s = &member.stats;
        println!(
            "{} ({} {}): {} created, {} updated, {} skipped, {} rejected",
            member.member.bold(),
            member.dialect,
            member.entity,
            s.created.to_string().green(),
            s.updated,
            s.skipped,
            if s.rejected > 0 {
                s.rejected.to_string().red()
            } else {
                s.rejected.to_string().normal()
            }
        );
        if member.placeholders > 0 {
            println!(
                "  {} placeholder contacts created for unknown talkgroups",
                member.placeholders.to_string().yellow()
            );
        }
        for err in member.errors.iter().take(MAX_ERRORS_SHOWN) {
            println!("  row {}: {}", err.row, err.message);
        }
        if member.errors.len() > MAX_ERRORS_SHOWN {
            println!("  ... and {} more", member.errors.len() - MAX_ERRORS_SHOWN);
        }
    }
    if !report.missing.is_empty() {
        println!("Not present: {}", report.missing.join(", ").dimmed());
    }

    let totals = report.totals();
    if report.members.len() > 1 {
        println!();
        println!(
            "Total: {} created, {} updated, {} skipped, {} rejected",
            totals.created, totals.updated, totals.skipped, totals.rejected
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    const CHANNELS: &str =
        "CH Name,RX Freq,TX Freq,CH mode\nSimplex,146.52,146.52,FM\nRepeater,146.94,146.34,FM\n";

    fn args(path: PathBuf) -> ImportArgs {
        ImportArgs {
            path,
            dialect: "auto".to_string(),
            entity: None,
            replace: false,
            zone: None,
        }
    }

    fn initialized(dir: &TempDir) -> PathBuf {
        let db = dir.path().join("codeplug.db");
        init::execute(Some(&db), false, true).unwrap();
        db
    }

    #[test]
    fn test_import_single_file_into_zone() {
        let dir = TempDir::new().unwrap();
        let db = initialized(&dir);
        let csv = dir.path().join("channels.csv");
        fs::write(&csv, CHANNELS).unwrap();

        let mut a = args(csv);
        a.zone = Some("Local".into());
        execute(&a, Some(&db), Some("tester"), true).unwrap();

        let storage = SqliteStorage::open(&db).unwrap();
        assert_eq!(storage.list_channels().unwrap().len(), 2);
        let zone = storage
            .get_collection(crate::model::CollectionKind::Zone, "Local")
            .unwrap();
        assert_eq!(zone.member_ids.len(), 2);
    }

    #[test]
    fn test_archive_runs_on_worker() {
        let dir = TempDir::new().unwrap();
        let db = initialized(&dir);
        let archive = dir.path().join("plug");
        fs::create_dir(&archive).unwrap();
        fs::write(archive.join("channels.csv"), CHANNELS).unwrap();

        let mut a = args(archive);
        a.dialect = "generic".into();
        execute(&a, Some(&db), None, true).unwrap();

        let storage = SqliteStorage::open(&db).unwrap();
        assert_eq!(storage.list_channels().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_dialect_is_rejected_before_import() {
        let dir = TempDir::new().unwrap();
        let db = initialized(&dir);
        let mut a = args(dir.path().join("channels.csv"));
        a.dialect = "baofeng".into();
        let err = execute(&a, Some(&db), None, true).unwrap_err();
        assert!(matches!(err, Error::UnknownDialect(_)));
    }
}
