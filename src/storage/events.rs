//! Audit event storage and retrieval.
//!
//! Every mutation records what it touched so a codeplug's history can be
//! inspected after a bulk import or renumber.

use rusqlite::{Connection, Result};

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    // Channel events
    ChannelCreated,
    ChannelUpdated,
    ChannelDeleted,
    ChannelsRenumbered,

    // Contact events
    ContactCreated,
    ContactPlaceholder,

    // Collection events
    CollectionCreated,
    CollectionDeleted,
    MembersReplaced,

    // Directory events
    DirectoryUpserted,
    DirectoryDeleted,
    AllowListImported,

    // Transfer events
    ImportCompleted,
    ExportCompleted,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChannelCreated => "channel_created",
            Self::ChannelUpdated => "channel_updated",
            Self::ChannelDeleted => "channel_deleted",
            Self::ChannelsRenumbered => "channels_renumbered",
            Self::ContactCreated => "contact_created",
            Self::ContactPlaceholder => "contact_placeholder",
            Self::CollectionCreated => "collection_created",
            Self::CollectionDeleted => "collection_deleted",
            Self::MembersReplaced => "members_replaced",
            Self::DirectoryUpserted => "directory_upserted",
            Self::DirectoryDeleted => "directory_deleted",
            Self::AllowListImported => "allow_list_imported",
            Self::ImportCompleted => "import_completed",
            Self::ExportCompleted => "export_completed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "channel_created" => Self::ChannelCreated,
            "channel_deleted" => Self::ChannelDeleted,
            "channels_renumbered" => Self::ChannelsRenumbered,
            "contact_created" => Self::ContactCreated,
            "contact_placeholder" => Self::ContactPlaceholder,
            "collection_created" => Self::CollectionCreated,
            "collection_deleted" => Self::CollectionDeleted,
            "members_replaced" => Self::MembersReplaced,
            "directory_upserted" => Self::DirectoryUpserted,
            "directory_deleted" => Self::DirectoryDeleted,
            "allow_list_imported" => Self::AllowListImported,
            "import_completed" => Self::ImportCompleted,
            "export_completed" => Self::ExportCompleted,
            _ => Self::ChannelUpdated, // Fallback
        }
    }
}

/// An audit event record.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get events for an entity, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let limit = limit.unwrap_or(100);
    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(rusqlite::params![entity_type, entity_id, limit], |row| {
        Ok(Event {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            event_type: EventType::parse(row.get::<_, String>(3)?.as_str()),
            actor: row.get(4)?,
            old_value: row.get(5)?,
            new_value: row.get(6)?,
            comment: row.get(7)?,
            created_at: row.get(8)?,
        })
    })?;

    rows.collect()
}
