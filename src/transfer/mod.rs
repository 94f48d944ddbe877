//! Import/export orchestration.
//!
//! This module sequences the codecs over files and archives:
//! - Dependency-ordered archive import with per-member transactions
//! - Batched directory import with an optional allow set
//! - Snapshot export with zone, allow-list and contact-limit filters
//! - Progress snapshots through an explicit sink
//! - A worker thread with a cancel flag for long imports
//!
//! # Archive Layout
//!
//! An archive is a directory of CSV members named per dialect, e.g.
//! `Channel.CSV` and `DMRZone.CSV` for AnyTone. Export adds `manifest.json`
//! with the dialect, a timestamp and a SHA256 per member.

pub mod download;
pub mod export;
pub mod file;
pub mod hash;
pub mod import;
pub mod progress;
pub mod types;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

pub use export::{is_archive_path, Exporter, MANIFEST_NAME};
pub use import::{detect_archive, ImportSource, Importer};
pub use progress::{ChannelSink, JobStatus, LogSink, Progress, ProgressSink, ProgressSnapshot};
pub use types::{
    EntityStats, ExportOptions, ExportReport, ExportedMember, ImportMode, ImportOptions,
    ImportReport, MemberReport, TransferError, TransferResult,
};

/// A running import on its worker thread.
pub struct ImportJob {
    job_id: Uuid,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<Result<ImportReport>>,
}

impl ImportJob {
    #[must_use]
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Ask the worker to stop at the next member or batch boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker.
    ///
    /// # Errors
    ///
    /// Returns the import's error, or `Error::Transfer` if the worker panicked.
    pub fn join(self) -> Result<ImportReport> {
        self.handle
            .join()
            .map_err(|_| Error::Transfer("import worker panicked".to_string()))?
    }
}

/// Run an import on a dedicated thread.
///
/// The worker opens its own connection to `db_path`; SQLite connections are
/// not shared across threads. Every snapshot, including the terminal one,
/// goes to `sink`.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_import(
    db_path: PathBuf,
    source: ImportSource,
    options: ImportOptions,
    sink: Box<dyn ProgressSink>,
) -> Result<ImportJob> {
    let job_id = Uuid::new_v4();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let handle = std::thread::Builder::new()
        .name("cpm-import".to_string())
        .spawn(move || -> Result<ImportReport> {
            debug!(%job_id, db = %db_path.display(), "Import worker started");
            let mut storage = match SqliteStorage::open(&db_path) {
                Ok(storage) => storage,
                Err(e) => {
                    Progress::with_job_id(sink.as_ref(), job_id).fail(e.to_string());
                    return Err(e);
                }
            };
            Importer::new(&mut storage, &options, sink.as_ref())
                .with_job_id(job_id)
                .with_cancel(&flag)
                .run(&source)
                .map_err(Error::from)
        })?;

    Ok(ImportJob {
        job_id,
        cancel,
        handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    const CHANNELS: &str = "CH Name,RX Freq,TX Freq,CH mode\nSimplex,146.52,146.52,FM\nRepeater,146.94,146.34,FM\n";

    #[test]
    fn test_worker_imports_and_reports_through_channel() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("codeplug.db");
        let csv = dir.path().join("channels.csv");
        fs::write(&csv, CHANNELS).unwrap();

        let (tx, rx) = mpsc::channel();
        let job = spawn_import(
            db_path.clone(),
            ImportSource::Path(csv),
            ImportOptions::default(),
            Box::new(ChannelSink(tx)),
        )
        .unwrap();
        let job_id = job.job_id();
        let report = job.join().unwrap();
        assert_eq!(report.totals().created, 2);

        let snapshots: Vec<ProgressSnapshot> = rx.try_iter().collect();
        assert!(snapshots.iter().all(|s| s.job_id == job_id));
        assert_eq!(snapshots.last().unwrap().status, JobStatus::Completed);

        let storage = SqliteStorage::open(&db_path).unwrap();
        assert_eq!(storage.list_channels().unwrap().len(), 2);
    }

    #[test]
    fn test_cancelled_worker_stops_before_first_batch() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("codeplug.db");
        let csv = dir.path().join("user.csv");
        fs::write(
            &csv,
            "RADIO_ID,CALLSIGN,FIRST_NAME\n3100001,K1AA,Ann\n3100002,K1AB,Bob\n",
        )
        .unwrap();

        // Every publish waits for the gate, so the worker cannot pass its
        // start snapshot until the test has asked it to cancel.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (seen_tx, seen_rx) = mpsc::channel();
        let sink = move |s: &ProgressSnapshot| {
            let _ = gate_rx.recv_timeout(Duration::from_secs(5));
            let _ = seen_tx.send(s.status);
        };
        let options = ImportOptions {
            dialect: Some(crate::codec::Dialect::RadioId),
            batch_size: 1,
            ..ImportOptions::default()
        };

        let job = spawn_import(db_path.clone(), ImportSource::Path(csv), options, Box::new(sink))
            .unwrap();
        job.cancel();
        drop(gate_tx);

        assert!(matches!(job.join(), Err(Error::Cancelled)));
        assert_eq!(seen_rx.try_iter().last(), Some(JobStatus::Error));
        let storage = SqliteStorage::open(&db_path).unwrap();
        assert_eq!(storage.status_summary().unwrap().directory_entries, 0);
    }

    #[test]
    fn test_worker_failure_ends_in_error_snapshot() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let job = spawn_import(
            dir.path().join("codeplug.db"),
            ImportSource::Path(dir.path().join("missing.csv")),
            ImportOptions::default(),
            Box::new(ChannelSink(tx)),
        )
        .unwrap();

        while !job.is_finished() {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(job.join().is_err());
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.status, JobStatus::Error);
        assert!(last.message.contains("missing.csv"));
    }
}
