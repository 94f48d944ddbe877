//! Import orchestration.
//!
//! An [`Importer`] reads one file or one archive directory, decodes each
//! member in its dialect and writes the result through the storage layer.
//! Each member commits in its own transaction (directory members commit per
//! batch), so a later failure never rolls back earlier members.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec::{self, read_table, Dialect, DecodedBatch, Entity, RawTable, RowError};
use crate::membership::{append_members, replace_members};
use crate::model::{Channel, CollectionKind, Contact, DirectoryContact, Grouping, RoamingChannel};
use crate::resolve::ContactResolver;
use crate::storage::events::EventType;
use crate::storage::queries::{
    channel_exists, clear_channels, ensure_collection, insert_channel, insert_contact,
    list_contacts, member_ids_by_name, upsert_contact, upsert_directory, upsert_roaming_channel,
};
use crate::storage::SqliteStorage;
use crate::transfer::download;
use crate::transfer::file::{file_size, list_members, malformed, member_label, read_member};
use crate::transfer::progress::{Progress, ProgressSink, ProgressSnapshot};
use crate::transfer::types::{
    EntityStats, ImportMode, ImportOptions, ImportReport, MemberReport, TransferError,
    TransferResult,
};

/// Where an import reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// A single CSV file or an archive directory.
    Path(PathBuf),
    /// A directory feed fetched over HTTP.
    Url(String),
}

/// Collection kind stored by a grouping entity.
const fn grouping_kind(entity: Entity) -> Option<CollectionKind> {
    match entity {
        Entity::Zones => Some(CollectionKind::Zone),
        Entity::ScanLists => Some(CollectionKind::ScanList),
        Entity::RoamingZones => Some(CollectionKind::RoamingZone),
        _ => None,
    }
}

/// Work out which dialect an archive directory is in.
///
/// # Errors
///
/// Returns `TransferError::Undetermined` when no member of any layout is
/// present, and `TransferError::Malformed` when `channels.csv` matches no layout.
pub fn detect_archive(dir: &Path) -> TransferResult<Dialect> {
    let present = list_members(dir)?;
    let has_any = |dialect: Dialect| {
        dialect
            .members()
            .iter()
            .any(|(_, name)| present.contains(*name))
    };

    if has_any(Dialect::AnyTone) {
        return Ok(Dialect::AnyTone);
    }

    if present.contains("channels.csv") {
        let channels = dir.join("channels.csv");
        let table = read_member(&channels)?;
        return codec::sniff_channels(&table).map_err(|e| malformed(&channels, &e));
    }

    if has_any(Dialect::Dm32uv) {
        return Ok(Dialect::Dm32uv);
    }

    Err(TransferError::Undetermined(format!(
        "cannot tell the layout of {}; pass --dialect",
        dir.display()
    )))
}

/// Import driver for one job.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    options: &'a ImportOptions,
    progress: Progress<'a>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Importer<'a> {
    /// Create a new importer.
    pub fn new(
        storage: &'a mut SqliteStorage,
        options: &'a ImportOptions,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            storage,
            options,
            progress: Progress::new(sink),
            cancel: None,
        }
    }

    /// Report under a caller-chosen job id.
    #[must_use]
    pub fn with_job_id(mut self, job_id: Uuid) -> Self {
        self.progress.set_job_id(job_id);
        self
    }

    /// Stop between members and directory batches once `flag` is set.
    #[must_use]
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Run the import and publish a terminal snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first error that stopped the job. Members committed
    /// before it stay committed.
    pub fn run(&mut self, source: &ImportSource) -> TransferResult<ImportReport> {
        let result = match source {
            ImportSource::Path(path) if path.is_dir() => self.import_archive(path),
            ImportSource::Path(path) => self.import_file(path),
            ImportSource::Url(url) => self.import_url(url),
        };
        self.finish(result)
    }

    fn finish(&mut self, result: TransferResult<ImportReport>) -> TransferResult<ImportReport> {
        match &result {
            Ok(report) => {
                let totals = report.totals();
                self.progress.complete(format!(
                    "{} created, {} updated, {} skipped, {} rejected",
                    totals.created, totals.updated, totals.skipped, totals.rejected
                ));
            }
            Err(e) => self.progress.fail(e.to_string()),
        }
        result
    }

    fn check_cancel(&self) -> TransferResult<()> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!(job_id = %self.progress.snapshot().job_id, "Import cancelled");
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }

    fn import_url(&mut self, url: &str) -> TransferResult<ImportReport> {
        self.progress.start(0, format!("Downloading {url}"));
        let bytes = download::fetch(url)?;
        let table = read_table(bytes.as_slice()).map_err(|e| TransferError::Malformed {
            member: url.to_string(),
            message: e.to_string(),
        })?;
        self.import_single(url, &table)
    }

    fn import_file(&mut self, path: &Path) -> TransferResult<ImportReport> {
        debug!(path = %path.display(), bytes = file_size(path), "Reading import file");
        let table = read_member(path)?;
        self.import_single(&member_label(path), &table)
    }

    fn import_single(&mut self, label: &str, table: &RawTable) -> TransferResult<ImportReport> {
        let (dialect, entity) = self.single_layout(table).map_err(|e| match e {
            TransferError::Store(crate::error::Error::Codec(codec_err)) => TransferError::Malformed {
                member: label.to_string(),
                message: codec_err.to_string(),
            },
            other => other,
        })?;
        self.progress.start(table.len(), format!("Importing {label}"));
        let member = self.import_table(label, dialect, entity, table, true)?;
        Ok(ImportReport {
            members: vec![member],
            missing: Vec::new(),
        })
    }

    fn single_layout(&self, table: &RawTable) -> TransferResult<(Dialect, Entity)> {
        let layout = match (self.options.dialect, self.options.entity) {
            (Some(dialect), Some(entity)) => (dialect, entity),
            (Some(Dialect::RadioId), None) => (Dialect::RadioId, Entity::DigitalContacts),
            (Some(dialect), None) => (dialect, Entity::Channels),
            (None, Some(Entity::Channels)) => (codec::sniff_channels(table)?, Entity::Channels),
            (None, Some(entity)) => {
                return Err(TransferError::Undetermined(format!(
                    "--dialect is required to import {entity}"
                )));
            }
            (None, None) => codec::sniff(table)?,
        };
        Ok(layout)
    }

    fn import_archive(&mut self, dir: &Path) -> TransferResult<ImportReport> {
        let dialect = match self.options.dialect {
            Some(dialect) => dialect,
            None => detect_archive(dir)?,
        };

        let listing = list_members(dir)?;
        let mut report = ImportReport::default();
        let mut present = Vec::new();
        for (entity, name) in dialect.members() {
            if listing.contains(*name) {
                present.push((*entity, *name, dir.join(name)));
            } else {
                debug!(member = name, "Skipping missing archive member");
                report.missing.push((*name).to_string());
            }
        }
        if present.is_empty() {
            return Err(TransferError::FileNotFound(format!(
                "{} has no {dialect} members",
                dir.display()
            )));
        }

        info!(
            dialect = dialect.as_str(),
            members = present.len(),
            path = %dir.display(),
            "Importing archive"
        );
        self.progress
            .start(present.len(), format!("Importing {dialect} archive"));

        for (entity, name, path) in present {
            self.check_cancel()?;
            self.progress.note(format!("Importing {name}"));
            let table = read_member(&path)?;
            let member = self.import_table(name, dialect, entity, &table, false)?;
            self.progress.advance(1, format!("Imported {name}"));
            report.members.push(member);
        }
        Ok(report)
    }

    /// Decode and store one table.
    ///
    /// With `row_progress`, the job counter moves by rows instead of members.
    fn import_table(
        &mut self,
        label: &str,
        dialect: Dialect,
        entity: Entity,
        table: &RawTable,
        row_progress: bool,
    ) -> TransferResult<MemberReport> {
        let batch = codec::decode(dialect, entity, table)?;
        debug!(
            member = label,
            accepted = batch.accepted(),
            rejected = batch.errors().len(),
            "Decoded member"
        );
        let errors = batch.errors().to_vec();
        let mut report = MemberReport {
            member: label.to_string(),
            dialect,
            entity,
            stats: EntityStats {
                rejected: errors.len(),
                ..EntityStats::default()
            },
            placeholders: 0,
            errors,
        };

        match batch {
            DecodedBatch::Channels(decoded) => self.store_channels(decoded.items, &mut report)?,
            DecodedBatch::Contacts(decoded) => self.store_talkgroups(decoded.items, &mut report)?,
            DecodedBatch::Directory(decoded) => {
                self.store_directory(decoded.items, &mut report, row_progress)?;
            }
            DecodedBatch::Groupings(entity, decoded) => {
                let kind = grouping_kind(entity).ok_or_else(|| {
                    TransferError::Undetermined(format!("{entity} is not a collection"))
                })?;
                self.store_groupings(kind, decoded.items, &mut report)?;
            }
            DecodedBatch::RoamingChannels(decoded) => {
                self.store_roaming_channels(decoded.items, &mut report)?;
            }
        }

        if row_progress && entity != Entity::DigitalContacts {
            self.progress.advance(table.len(), format!("Imported {label}"));
        }
        if !report.errors.is_empty() {
            warn!(member = label, problems = report.errors.len(), "Rows rejected during import");
        }
        info!(
            member = label,
            entity = entity.as_str(),
            created = report.stats.created,
            updated = report.stats.updated,
            skipped = report.stats.skipped,
            rejected = report.stats.rejected,
            "Imported member"
        );
        Ok(report)
    }

    fn store_channels(&mut self, items: Vec<Channel>, report: &mut MemberReport) -> TransferResult<()> {
        let options = self.options;
        let label = report.member.clone();

        self.storage.mutate("import_channels", &options.actor, |tx, ctx| {
            if options.mode == ImportMode::Replace {
                let cleared = clear_channels(tx)?;
                info!(cleared, "Cleared channels for replace import");
            }

            let mut seen = HashSet::new();
            let mut fresh = Vec::with_capacity(items.len());
            for channel in items {
                if let Err(e) = channel.validate() {
                    // Row numbers are gone after decode; name the channel instead
                    report.stats.rejected += 1;
                    report.errors.push(RowError {
                        row: 0,
                        message: format!("{}: {e}", channel.name),
                    });
                    continue;
                }
                if options.mode == ImportMode::Merge
                    && (!seen.insert((channel.name.clone(), channel.rx_frequency.to_bits()))
                        || channel_exists(tx, &channel.name, channel.rx_frequency)?)
                {
                    report.stats.skipped += 1;
                    continue;
                }
                fresh.push(channel);
            }

            let mut resolver = ContactResolver::new(&list_contacts(tx)?);
            let resolved = resolver.resolve(&mut fresh, |contact| {
                let id = insert_contact(tx, contact)?;
                ctx.record_event("contact", &id.to_string(), EventType::ContactPlaceholder);
                Ok(id)
            })?;
            report.placeholders = resolved.created;

            let mut ids = Vec::with_capacity(fresh.len());
            for channel in &fresh {
                ids.push(insert_channel(tx, channel)?);
            }
            report.stats.created = ids.len();

            if let Some(zone) = &options.zone {
                let (zone_id, created) = ensure_collection(tx, CollectionKind::Zone, zone)?;
                if created {
                    ctx.record_event("zone", &zone_id.to_string(), EventType::CollectionCreated);
                }
                let added = append_members(tx, CollectionKind::Zone, zone_id, &ids)?;
                debug!(zone = %zone, added, "Added imported channels to zone");
            }

            ctx.record_comment(
                "import",
                &label,
                EventType::ImportCompleted,
                &format!(
                    "{} channels created, {} skipped, {} placeholders",
                    report.stats.created, report.stats.skipped, report.placeholders
                ),
            );
            Ok(())
        })?;
        Ok(())
    }

    fn store_talkgroups(&mut self, items: Vec<Contact>, report: &mut MemberReport) -> TransferResult<()> {
        let label = report.member.clone();
        self.storage.mutate("import_talkgroups", &self.options.actor, |tx, ctx| {
            for contact in &items {
                let (id, created) = upsert_contact(tx, contact)?;
                if created {
                    report.stats.created += 1;
                    ctx.record_event("contact", &id.to_string(), EventType::ContactCreated);
                } else {
                    report.stats.updated += 1;
                }
            }
            ctx.record_comment(
                "import",
                &label,
                EventType::ImportCompleted,
                &format!("{} talkgroups", items.len()),
            );
            Ok(())
        })?;
        Ok(())
    }

    fn store_directory(
        &mut self,
        mut items: Vec<DirectoryContact>,
        report: &mut MemberReport,
        row_progress: bool,
    ) -> TransferResult<()> {
        let options = self.options;
        if let Some(allow) = &options.allow {
            let before = items.len();
            items.retain(|entry| allow.contains(&entry.dmr_id));
            report.stats.skipped += before - items.len();
        }

        let batch_size = options.batch_size.max(1);
        let batches = items.len().div_ceil(batch_size);
        for (i, chunk) in items.chunks(batch_size).enumerate() {
            self.check_cancel()?;

            let (created, updated) = self.storage.mutate("import_directory", &options.actor, |tx, ctx| {
                let mut created = 0;
                for entry in chunk {
                    if upsert_directory(tx, entry)? {
                        created += 1;
                    }
                }
                ctx.record_comment(
                    "directory",
                    &report.member,
                    EventType::DirectoryUpserted,
                    &format!("batch {} of {batches}: {} rows", i + 1, chunk.len()),
                );
                Ok((created, chunk.len() - created))
            })?;

            report.stats.created += created;
            report.stats.updated += updated;
            debug!(batch = i + 1, batches, rows = chunk.len(), "Committed directory batch");
            if row_progress {
                self.progress.advance(
                    chunk.len(),
                    format!("{}: batch {} of {batches}", report.member, i + 1),
                );
            }
        }
        Ok(())
    }

    fn store_groupings(
        &mut self,
        kind: CollectionKind,
        items: Vec<Grouping>,
        report: &mut MemberReport,
    ) -> TransferResult<()> {
        let label = report.member.clone();
        self.storage.mutate("import_collections", &self.options.actor, |tx, ctx| {
            let lookup = member_ids_by_name(tx, kind)?;
            for grouping in &items {
                let mut ids = Vec::with_capacity(grouping.members.len());
                for name in &grouping.members {
                    match lookup.get(name) {
                        Some(id) => ids.push(*id),
                        None => report.errors.push(RowError {
                            row: 0,
                            message: format!(
                                "{} '{}': unknown member '{name}'",
                                kind.as_str(),
                                grouping.name
                            ),
                        }),
                    }
                }

                let (id, created) = ensure_collection(tx, kind, &grouping.name)?;
                replace_members(tx, kind, id, &ids)?;
                if created {
                    report.stats.created += 1;
                    ctx.record_event(kind.as_str(), &id.to_string(), EventType::CollectionCreated);
                } else {
                    report.stats.updated += 1;
                }
            }
            ctx.record_comment(
                "import",
                &label,
                EventType::ImportCompleted,
                &format!("{} {} collections", items.len(), kind.as_str()),
            );
            Ok(())
        })?;
        Ok(())
    }

    fn store_roaming_channels(
        &mut self,
        items: Vec<RoamingChannel>,
        report: &mut MemberReport,
    ) -> TransferResult<()> {
        let label = report.member.clone();
        self.storage.mutate("import_roaming_channels", &self.options.actor, |tx, ctx| {
            for channel in &items {
                let (_, created) = upsert_roaming_channel(tx, channel)?;
                if created {
                    report.stats.created += 1;
                } else {
                    report.stats.updated += 1;
                }
            }
            ctx.record_comment(
                "import",
                &label,
                EventType::ImportCompleted,
                &format!("{} roaming channels", items.len()),
            );
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::progress::{ChannelSink, JobStatus, LogSink};
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    const DM32_TALKGROUPS: &str = "No.,Name,ID,Type\n1,Local 9,9,Group Call\n";
    const DM32_CHANNELS: &str = "Channel Name,Channel Type,RX Frequency[MHz],TX Frequency[MHz],Color Code,Time Slot,TX Contact\n\
                                 Hotspot,Digital,438.80000,438.80000,1,Slot 2,Local 9\n\
                                 Simplex,Analog,146.52000,146.52000,,,\n";
    const DM32_ZONES: &str = "No.,Zone Name,Channel Members\n1,Home,Simplex|Hotspot|Ghost\n";
    const RADIOID: &str = "RADIO_ID,CALLSIGN,FIRST_NAME,LAST_NAME,CITY,STATE,COUNTRY\n\
                           666,K6AB,Ann,Lee,Reno,NV,United States\n\
                           3100001,K1AB,Bob,Ray,Boston,MA,United States\n\
                           3100002,K1AC,Cal,Fox,Boston,MA,United States\n\
                           3100003,K1AD,Dee,Orr,Boston,MA,United States\n\
                           3100004,K1AE,Eve,Pym,Boston,MA,United States\n";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn options() -> ImportOptions {
        ImportOptions {
            actor: "test".to_string(),
            ..ImportOptions::default()
        }
    }

    #[test]
    fn test_archive_imports_in_dependency_order() {
        let dir = TempDir::new().unwrap();
        // Zones reference channels, channels reference talkgroups
        write(dir.path(), "zones.csv", DM32_ZONES);
        write(dir.path(), "channels.csv", DM32_CHANNELS);
        write(dir.path(), "talkgroups.csv", DM32_TALKGROUPS);

        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = options();
        let sink = LogSink;
        let report = Importer::new(&mut storage, &opts, &sink)
            .run(&ImportSource::Path(dir.path().to_path_buf()))
            .unwrap();

        let order: Vec<&str> = report.members.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(order, vec!["talkgroups.csv", "channels.csv", "zones.csv"]);
        assert!(report.missing.contains(&"digital_contacts.csv".to_string()));

        // Talkgroup arrived first, so no placeholder was needed
        assert_eq!(report.members[1].placeholders, 0);
        let contacts = storage.list_contacts().unwrap();
        assert_eq!(contacts.len(), 1);
        let hotspot = storage
            .list_channels()
            .unwrap()
            .into_iter()
            .find(|c| c.name == "Hotspot")
            .unwrap();
        assert_eq!(hotspot.contact_id, Some(contacts[0].id));

        let zone = storage.get_collection(CollectionKind::Zone, "Home").unwrap();
        assert_eq!(zone.member_ids.len(), 2);
        assert_eq!(report.members[2].errors.len(), 1);
    }

    #[test]
    fn test_merge_skips_duplicates_and_replace_clears() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "channels.csv", DM32_CHANNELS);
        let source = ImportSource::Path(path);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let sink = LogSink;

        let opts = options();
        Importer::new(&mut storage, &opts, &sink).run(&source).unwrap();
        let again = Importer::new(&mut storage, &opts, &sink).run(&source).unwrap();
        assert_eq!(again.members[0].stats.skipped, 2);
        assert_eq!(storage.list_channels().unwrap().len(), 2);

        let replace = ImportOptions {
            mode: ImportMode::Replace,
            ..options()
        };
        Importer::new(&mut storage, &replace, &sink).run(&source).unwrap();
        let ids: Vec<i64> = storage.list_channels().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_zone_option_appends_imported_channels() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "channels.csv", DM32_CHANNELS);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = ImportOptions {
            zone: Some("Portable".to_string()),
            ..options()
        };
        let sink = LogSink;
        let report = Importer::new(&mut storage, &opts, &sink)
            .run(&ImportSource::Path(path))
            .unwrap();

        // No talkgroups in the store, so the Hotspot contact is a placeholder
        assert_eq!(report.members[0].placeholders, 1);
        let zone = storage.get_collection(CollectionKind::Zone, "Portable").unwrap();
        assert_eq!(zone.member_ids.len(), 2);
    }

    #[test]
    fn test_directory_batches_publish_progress() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "user.csv", RADIOID);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = ImportOptions {
            batch_size: 2,
            ..options()
        };
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink(tx);
        let report = Importer::new(&mut storage, &opts, &sink)
            .run(&ImportSource::Path(path))
            .unwrap();

        assert_eq!(report.members[0].entity, Entity::DigitalContacts);
        assert_eq!(report.members[0].stats.created, 5);

        let seen: Vec<ProgressSnapshot> = rx.try_iter().collect();
        let processed: Vec<usize> = seen.iter().map(|s| s.processed).collect();
        assert_eq!(processed, vec![0, 2, 4, 5, 5]);
        assert_eq!(seen.last().unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_directory_resurrects_soft_deleted_entry() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "user.csv", RADIOID);
        let source = ImportSource::Path(path);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = options();
        let sink = LogSink;

        Importer::new(&mut storage, &opts, &sink).run(&source).unwrap();
        storage.delete_directory(666, "test").unwrap();
        assert!(storage.lookup_directory(666).is_err());

        let report = Importer::new(&mut storage, &opts, &sink).run(&source).unwrap();
        assert_eq!(report.members[0].stats.updated, 5);
        let entry = storage.lookup_directory(666).unwrap();
        assert_eq!(entry.deleted_at, None);
        assert_eq!(entry.name, "Ann Lee");
    }

    #[test]
    fn test_allow_set_filters_directory() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "user.csv", RADIOID);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = ImportOptions {
            allow: Some([666, 3_100_003].into_iter().collect()),
            ..options()
        };
        let sink = LogSink;
        let report = Importer::new(&mut storage, &opts, &sink)
            .run(&ImportSource::Path(path))
            .unwrap();
        assert_eq!(report.members[0].stats.created, 2);
        assert_eq!(report.members[0].stats.skipped, 3);
    }

    #[test]
    fn test_cancel_before_first_member() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "channels.csv", DM32_CHANNELS);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = options();
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink(tx);
        let cancel = AtomicBool::new(true);

        let result = Importer::new(&mut storage, &opts, &sink)
            .with_cancel(&cancel)
            .run(&ImportSource::Path(dir.path().to_path_buf()));

        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert!(storage.list_channels().unwrap().is_empty());
        assert_eq!(rx.try_iter().last().unwrap().status, JobStatus::Error);
    }

    #[test]
    fn test_malformed_member_keeps_earlier_members() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "channels.csv", DM32_CHANNELS);
        write(dir.path(), "zones.csv", "");
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = ImportOptions {
            dialect: Some(Dialect::Dm32uv),
            ..options()
        };
        let sink = LogSink;

        let result = Importer::new(&mut storage, &opts, &sink)
            .run(&ImportSource::Path(dir.path().to_path_buf()));

        match result {
            Err(TransferError::Malformed { member, .. }) => assert_eq!(member, "zones.csv"),
            other => panic!("expected malformed, got {other:?}"),
        }
        assert_eq!(storage.list_channels().unwrap().len(), 2);
    }

    #[test]
    fn test_unrecognized_single_file_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "mystery.csv", "Foo,Bar\n1,2\n");
        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = options();
        let sink = LogSink;
        let result = Importer::new(&mut storage, &opts, &sink).run(&ImportSource::Path(path));
        assert!(matches!(result, Err(TransferError::Malformed { .. })));
    }

    #[test]
    fn test_detect_archive_layouts() {
        let anytone = TempDir::new().unwrap();
        write(anytone.path(), "DMRZone.CSV", "\"No.\",\"Zone Name\"\r\n");
        assert_eq!(detect_archive(anytone.path()).unwrap(), Dialect::AnyTone);

        let dm32 = TempDir::new().unwrap();
        write(dm32.path(), "channels.csv", DM32_CHANNELS);
        assert_eq!(detect_archive(dm32.path()).unwrap(), Dialect::Dm32uv);

        let empty = TempDir::new().unwrap();
        assert!(matches!(
            detect_archive(empty.path()),
            Err(TransferError::Undetermined(_))
        ));
    }

    #[test]
    fn test_archive_member_names_are_case_sensitive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "CHANNELS.CSV", DM32_CHANNELS);
        write(dir.path(), "Talkgroups.csv", DM32_TALKGROUPS);

        assert!(matches!(
            detect_archive(dir.path()),
            Err(TransferError::Undetermined(_))
        ));

        let mut storage = SqliteStorage::open_memory().unwrap();
        let opts = ImportOptions {
            dialect: Some(Dialect::Dm32uv),
            ..options()
        };
        let result = Importer::new(&mut storage, &opts, &LogSink)
            .run(&ImportSource::Path(dir.path().to_path_buf()));
        assert!(matches!(result, Err(TransferError::FileNotFound(_))));
        assert!(storage.list_channels().unwrap().is_empty());
    }
}
