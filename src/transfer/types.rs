//! Types shared by import and export.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::codec::{CodecError, Dialect, Entity, RowError};
use crate::error::Error;

/// What to do with channels already in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep existing channels; skip incoming ones with the same name and RX frequency.
    #[default]
    Merge,
    /// Clear the channel table first.
    Replace,
}

/// Import settings.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Forced dialect; detected from the header or archive layout when unset.
    pub dialect: Option<Dialect>,
    /// Forced entity for a single file.
    pub entity: Option<Entity>,
    pub mode: ImportMode,
    /// Zone that receives every imported channel.
    pub zone: Option<String>,
    /// Directory rows per transaction.
    pub batch_size: usize,
    /// Only directory IDs in this set are imported.
    pub allow: Option<HashSet<i64>>,
    /// Actor recorded in the audit trail.
    pub actor: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dialect: None,
            entity: None,
            mode: ImportMode::Merge,
            zone: None,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            allow: None,
            actor: crate::config::DEFAULT_ACTOR.to_string(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub dialect: Dialect,
    /// Single-file export of this entity; `None` means channels.
    pub entity: Option<Entity>,
    /// Limit channels and zones to this zone.
    pub zone: Option<String>,
    /// Maximum directory entries written.
    pub contact_limit: Option<usize>,
    /// Stored allow list filtering directory entries.
    pub allow_list: Option<String>,
    pub actor: String,
}

impl ExportOptions {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            entity: None,
            zone: None,
            contact_limit: None,
            allow_list: None,
            actor: crate::config::DEFAULT_ACTOR.to_string(),
        }
    }
}

/// Per-member statistics for import operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    /// Number of new records created.
    pub created: usize,
    /// Number of existing records updated.
    pub updated: usize,
    /// Number of records skipped (duplicates or outside the allow list).
    pub skipped: usize,
    /// Number of rows rejected by the decoder or validation.
    pub rejected: usize,
}

impl EntityStats {
    /// Total records processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.rejected
    }
}

/// Result of importing one table.
#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub member: String,
    pub dialect: Dialect,
    pub entity: Entity,
    pub stats: EntityStats,
    /// Placeholder contacts created while linking talkgroups.
    pub placeholders: usize,
    pub errors: Vec<RowError>,
}

/// Result of a whole import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub members: Vec<MemberReport>,
    /// Archive members not present on disk.
    pub missing: Vec<String>,
}

impl ImportReport {
    /// Sum of all member stats.
    #[must_use]
    pub fn totals(&self) -> EntityStats {
        self.members.iter().fold(EntityStats::default(), |acc, m| EntityStats {
            created: acc.created + m.stats.created,
            updated: acc.updated + m.stats.updated,
            skipped: acc.skipped + m.stats.skipped,
            rejected: acc.rejected + m.stats.rejected,
        })
    }
}

/// One written file.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedMember {
    pub name: String,
    pub entity: Entity,
    pub rows: usize,
    pub sha256: String,
}

/// Result of an export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub dialect: Dialect,
    pub path: PathBuf,
    pub members: Vec<ExportedMember>,
    /// Manifest path for archive exports.
    pub manifest: Option<PathBuf>,
}

/// Transfer-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source file or archive not found.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A member could not be read as a table in its layout.
    #[error("Malformed file {member}: {message}")]
    Malformed { member: String, message: String },

    /// Dialect or entity could not be worked out.
    #[error("{0}")]
    Undetermined(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cancelled")]
    Cancelled,

    /// Store error, passed through unchanged.
    #[error(transparent)]
    Store(#[from] Error),
}

impl From<rusqlite::Error> for TransferError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(Error::Database(err))
    }
}

impl From<CodecError> for TransferError {
    fn from(err: CodecError) -> Self {
        Self::Store(Error::Codec(err))
    }
}

impl From<TransferError> for Error {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Io(e) => Self::Io(e),
            TransferError::Json(e) => Self::Json(e),
            TransferError::FileNotFound(path) => Self::Transfer(format!("file not found: {path}")),
            TransferError::Malformed { member, message } => Self::MalformedFile { member, message },
            TransferError::Undetermined(message) => Self::InvalidArgument(message),
            TransferError::Network(message) => Self::Network(message),
            TransferError::Cancelled => Self::Cancelled,
            TransferError::Store(e) => e,
        }
    }
}

/// Result type for transfer operations.
pub type TransferResult<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_stats_total() {
        let stats = EntityStats {
            created: 10,
            updated: 5,
            skipped: 2,
            rejected: 1,
        };
        assert_eq!(stats.total(), 18);
    }

    #[test]
    fn test_import_mode_default() {
        assert_eq!(ImportMode::default(), ImportMode::Merge);
    }

    #[test]
    fn test_malformed_keeps_its_code() {
        let err: Error = TransferError::Malformed {
            member: "Channel.CSV".into(),
            message: "empty header".into(),
        }
        .into();
        assert!(matches!(err, Error::MalformedFile { .. }));

        let err: Error = TransferError::Store(Error::ZoneNotFound { name: "Home".into() }).into();
        assert!(matches!(err, Error::ZoneNotFound { .. }));
    }
}
