//! Export orchestration.
//!
//! The exporter takes one snapshot of the store, narrows it by zone, allow
//! list and contact limit, then encodes either one file or every member of
//! the dialect's archive plus a `manifest.json`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::codec::{self, dm32uv, render_table, Dialect, Entity};
use crate::error::Error;
use crate::model::{Codeplug, CollectionKind};
use crate::storage::events::EventType;
use crate::storage::SqliteStorage;
use crate::transfer::file::atomic_write;
use crate::transfer::hash::content_hash;
use crate::transfer::types::{ExportOptions, ExportReport, ExportedMember, TransferResult};

/// File written next to archive members.
pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Serialize)]
struct Manifest<'m> {
    dialect: Dialect,
    exported_at: String,
    members: &'m [ExportedMember],
}

/// Whether `path` names an archive directory rather than a single file.
///
/// Existing directories, and paths without an extension, are archives.
#[must_use]
pub fn is_archive_path(path: &Path) -> bool {
    path.is_dir() || path.extension().is_none()
}

/// Export driver.
pub struct Exporter<'a> {
    storage: &'a mut SqliteStorage,
    options: &'a ExportOptions,
}

impl<'a> Exporter<'a> {
    /// Create a new exporter.
    pub fn new(storage: &'a mut SqliteStorage, options: &'a ExportOptions) -> Self {
        Self { storage, options }
    }

    /// The codeplug as it will be written.
    ///
    /// # Errors
    ///
    /// Returns `Error::ZoneNotFound` or `Error::AllowListNotFound` for
    /// unknown filters, or a database error.
    pub fn snapshot(&self) -> TransferResult<Codeplug> {
        let mut plug = self.storage.load_codeplug()?;

        if let Some(zone) = &self.options.zone {
            let collection = self.storage.get_collection(CollectionKind::Zone, zone)?;
            let mut by_id: HashMap<i64, _> = plug.channels.drain(..).map(|c| (c.id, c)).collect();
            plug.channels = collection
                .member_ids
                .iter()
                .filter_map(|id| by_id.remove(id))
                .collect();
            plug.zones.retain(|z| z.name == *zone);

            let kept: HashSet<String> = plug.channels.iter().map(|c| c.name.clone()).collect();
            for list in &mut plug.scan_lists {
                list.members.retain(|m| kept.contains(m));
            }
            debug!(zone = %zone, channels = plug.channels.len(), "Limited export to zone");
        }

        if let Some(name) = &self.options.allow_list {
            let allow = self.storage.allow_list(name)?;
            plug.directory.retain(|entry| allow.contains(&entry.dmr_id));
        }

        let limit = self.options.contact_limit.or(match self.options.dialect {
            Dialect::Dm32uv => Some(dm32uv::DEFAULT_CONTACT_LIMIT),
            _ => None,
        });
        if let Some(limit) = limit {
            plug.directory.truncate(limit);
        }

        Ok(plug)
    }

    /// Write the export to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the dialect cannot be written, a filter is
    /// unknown, or a file cannot be written. Archive members already written
    /// stay on disk.
    pub fn export(&mut self, path: &Path) -> TransferResult<ExportReport> {
        let dialect = self.options.dialect;
        if !dialect.can_encode() {
            return Err(Error::InvalidArgument(format!("{dialect} is import only")).into());
        }

        let plug = self.snapshot()?;
        let report = if is_archive_path(path) {
            self.write_archive(path, &plug)?
        } else {
            let entity = self.options.entity.unwrap_or(Entity::Channels);
            let member = write_member(path, dialect, entity, &plug)?;
            ExportReport {
                dialect,
                path: path.to_path_buf(),
                members: vec![member],
                manifest: None,
            }
        };

        let rows: usize = report.members.iter().map(|m| m.rows).sum();
        let target = path.display().to_string();
        self.storage.mutate("export", &self.options.actor, |_, ctx| {
            ctx.record_comment(
                "export",
                &target,
                EventType::ExportCompleted,
                &format!("{dialect}: {} files, {rows} rows", report.members.len()),
            );
            Ok(())
        })?;
        info!(
            dialect = dialect.as_str(),
            files = report.members.len(),
            rows,
            path = %target,
            "Export completed"
        );
        Ok(report)
    }

    fn write_archive(&self, dir: &Path, plug: &Codeplug) -> TransferResult<ExportReport> {
        let dialect = self.options.dialect;
        std::fs::create_dir_all(dir)?;

        let mut members = Vec::with_capacity(dialect.members().len());
        for (entity, name) in dialect.members() {
            members.push(write_member(&dir.join(name), dialect, *entity, plug)?);
        }

        let manifest_path: PathBuf = dir.join(MANIFEST_NAME);
        let manifest = Manifest {
            dialect,
            exported_at: chrono::Utc::now().to_rfc3339(),
            members: &members,
        };
        atomic_write(&manifest_path, serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        Ok(ExportReport {
            dialect,
            path: dir.to_path_buf(),
            members,
            manifest: Some(manifest_path),
        })
    }
}

fn write_member(
    path: &Path,
    dialect: Dialect,
    entity: Entity,
    plug: &Codeplug,
) -> TransferResult<ExportedMember> {
    let table = codec::encode(dialect, entity, plug)?;
    let text = render_table(&table, dialect.table_style())?;
    atomic_write(path, text.as_bytes())?;
    debug!(path = %path.display(), rows = table.len(), "Wrote export member");

    Ok(ExportedMember {
        name: path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
        entity,
        rows: table.len(),
        sha256: content_hash(text.as_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Channel, ChannelType, DirectoryContact, Protocol};
    use crate::storage::queries::upsert_directory;
    use std::fs;
    use tempfile::TempDir;

    fn seeded() -> SqliteStorage {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let a = storage.create_channel(&Channel::new("Simplex", 146.52, 146.52), "t").unwrap();
        let mut dmr = Channel::new("Hotspot", 438.8, 438.8);
        dmr.channel_type = ChannelType::DigitalDmr;
        dmr.protocol = Protocol::Dmr;
        dmr.color_code = 1;
        dmr.tx_contact = Some("Local 9".into());
        let b = storage.create_channel(&dmr, "t").unwrap();
        storage.create_channel(&Channel::new("Other", 147.0, 147.6), "t").unwrap();
        storage.resolve_contacts("t").unwrap();
        storage.create_collection(CollectionKind::Zone, "Home", "t").unwrap();
        storage
            .assign_members(CollectionKind::Zone, "Home", &[b, a], false, "t")
            .unwrap();
        for id in [3_100_001, 3_100_002, 3_100_003] {
            let entry = DirectoryContact {
                dmr_id: id,
                name: format!("Op {id}"),
                callsign: format!("K{id}"),
                ..DirectoryContact::default()
            };
            upsert_directory(storage.conn(), &entry).unwrap();
        }
        storage
    }

    #[test]
    fn test_archive_export_writes_every_member_and_manifest() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("at890");
        let mut storage = seeded();
        let opts = ExportOptions::new(Dialect::AnyTone);

        let report = Exporter::new(&mut storage, &opts).export(&out).unwrap();
        assert_eq!(report.members.len(), Dialect::AnyTone.members().len());
        assert!(out.join("Channel.CSV").is_file());

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_NAME)).unwrap()).unwrap();
        assert_eq!(manifest["dialect"], "anytone");
        let channel_entry = manifest["members"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["name"] == "Channel.CSV")
            .unwrap();
        let bytes = fs::read(out.join("Channel.CSV")).unwrap();
        assert_eq!(channel_entry["sha256"], content_hash(&bytes));
        assert_eq!(channel_entry["rows"], 3);
    }

    #[test]
    fn test_zone_limits_channels_in_zone_order() {
        let mut storage = seeded();
        let opts = ExportOptions {
            zone: Some("Home".into()),
            ..ExportOptions::new(Dialect::Generic)
        };
        let plug = Exporter::new(&mut storage, &opts).snapshot().unwrap();
        let names: Vec<&str> = plug.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Hotspot", "Simplex"]);
        assert_eq!(plug.zones.len(), 1);

        let missing = ExportOptions {
            zone: Some("Nope".into()),
            ..ExportOptions::new(Dialect::Generic)
        };
        assert!(Exporter::new(&mut storage, &missing).snapshot().is_err());
    }

    #[test]
    fn test_contact_limit_and_allow_list() {
        let mut storage = seeded();
        let allow: HashSet<i64> = [3_100_002, 3_100_003].into_iter().collect();
        storage.import_allow_list("local", &allow, "t").unwrap();

        let opts = ExportOptions {
            allow_list: Some("local".into()),
            contact_limit: Some(1),
            ..ExportOptions::new(Dialect::Dm32uv)
        };
        let plug = Exporter::new(&mut storage, &opts).snapshot().unwrap();
        assert_eq!(plug.directory.len(), 1);
        assert!(allow.contains(&plug.directory[0].dmr_id));
    }

    #[test]
    fn test_single_file_chirp_skips_dmr() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("chirp.csv");
        let mut storage = seeded();
        let opts = ExportOptions::new(Dialect::Chirp);

        let report = Exporter::new(&mut storage, &opts).export(&out).unwrap();
        assert_eq!(report.members.len(), 1);
        assert_eq!(report.members[0].rows, 2);
        assert!(report.manifest.is_none());
    }

    #[test]
    fn test_radioid_cannot_be_exported() {
        let dir = TempDir::new().unwrap();
        let mut storage = seeded();
        let opts = ExportOptions::new(Dialect::RadioId);
        let err = Exporter::new(&mut storage, &opts)
            .export(&dir.path().join("user.csv"))
            .unwrap_err();
        assert!(matches!(
            Error::from(err),
            Error::InvalidArgument(_)
        ));
    }
}
