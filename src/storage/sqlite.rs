//! SQLite storage implementation.
//!
//! Every write goes through [`SqliteStorage::mutate`], which wraps the work
//! in an IMMEDIATE transaction and appends the audit events the closure
//! recorded before committing.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::membership::{self, RenumberReport};
use crate::model::{AllowList, Channel, Codeplug, Collection, CollectionKind, Contact, DirectoryContact};
use crate::resolve::{ContactResolver, ResolveStats};
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::queries;
use crate::storage::schema::apply_schema;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation.
///
/// Passed to mutation closures so they can record audit events that are
/// written in the same transaction.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Record an event carrying a free-form summary.
    pub fn record_comment(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        comment: &str,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(comment),
        );
    }
}

/// Entity counts for `cpm status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSummary {
    pub channels: usize,
    pub contacts: usize,
    pub placeholder_contacts: usize,
    pub zones: usize,
    pub scan_lists: usize,
    pub roaming_channels: usize,
    pub roaming_zones: usize,
    pub directory_entries: usize,
    pub directory_deleted: usize,
    pub allow_lists: usize,
}

/// A channel that fails validation, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidChannel {
    pub id: i64,
    pub name: String,
    pub message: String,
}

pub(crate) fn not_found(kind: CollectionKind, name: &str) -> Error {
    let name = name.to_string();
    match kind {
        CollectionKind::Zone => Error::ZoneNotFound { name },
        CollectionKind::ScanList => Error::ScanListNotFound { name },
        CollectionKind::RoamingZone => Error::RoamingZoneNotFound { name },
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;

        Ok(result)
    }

    // ==================
    // Channel Operations
    // ==================

    /// All channels in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        queries::list_channels(&self.conn)
    }

    /// # Errors
    ///
    /// Returns `Error::ChannelNotFound` when no channel has this id.
    pub fn get_channel(&self, id: i64) -> Result<Channel> {
        queries::get_channel(&self.conn, id)?.ok_or(Error::ChannelNotFound { id })
    }

    /// Validate and store a new channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` before any write when the channel is invalid.
    pub fn create_channel(&mut self, channel: &Channel, actor: &str) -> Result<i64> {
        channel.validate()?;
        self.mutate("create_channel", actor, |tx, ctx| {
            let id = queries::insert_channel(tx, channel)?;
            ctx.record_event("channel", &id.to_string(), EventType::ChannelCreated);
            Ok(id)
        })
    }

    /// Validate and overwrite an existing channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when invalid and `Error::ChannelNotFound`
    /// when the id is unknown.
    pub fn update_channel(&mut self, channel: &Channel, actor: &str) -> Result<()> {
        channel.validate()?;
        self.mutate("update_channel", actor, |tx, ctx| {
            if queries::update_channel(tx, channel)? == 0 {
                return Err(Error::ChannelNotFound { id: channel.id });
            }
            ctx.record_event("channel", &channel.id.to_string(), EventType::ChannelUpdated);
            Ok(())
        })
    }

    /// Delete a channel; its memberships cascade.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelNotFound` when the id is unknown.
    pub fn delete_channel(&mut self, id: i64, actor: &str) -> Result<()> {
        self.mutate("delete_channel", actor, |tx, ctx| {
            let removed = tx.execute("DELETE FROM channels WHERE id = ?1", [id])?;
            if removed == 0 {
                return Err(Error::ChannelNotFound { id });
            }
            ctx.record_event("channel", &id.to_string(), EventType::ChannelDeleted);
            Ok(())
        })
    }

    /// Reassign channel ids to follow `ordered_ids`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RenumberMismatch` or `Error::RenumberInvalid` without
    /// touching the store when the list does not cover every channel once.
    pub fn renumber_channels(&mut self, ordered_ids: &[i64], actor: &str) -> Result<RenumberReport> {
        self.mutate("renumber_channels", actor, |tx, ctx| {
            let report = membership::renumber_channels(tx, ordered_ids)?;
            ctx.record_comment(
                "channel",
                "*",
                EventType::ChannelsRenumbered,
                &format!("{} channels renumbered", report.channels),
            );
            Ok(report)
        })
    }

    /// Channels that currently violate the model constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn invalid_channels(&self) -> Result<Vec<InvalidChannel>> {
        Ok(self
            .list_channels()?
            .into_iter()
            .filter_map(|c| {
                c.validate().err().map(|e| InvalidChannel {
                    id: c.id,
                    name: c.name.clone(),
                    message: e.to_string(),
                })
            })
            .collect())
    }

    /// Set every channel's bandwidth to the one its family implies.
    ///
    /// Returns the number of channels changed.
    ///
    /// # Errors
    ///
    /// Returns an error if an update fails; nothing is changed in that case.
    pub fn fix_bandwidths(&mut self, actor: &str) -> Result<usize> {
        self.mutate("fix_bandwidths", actor, |tx, ctx| {
            let mut changed = 0;
            for mut channel in queries::list_channels(tx)? {
                let expected = channel.expected_bandwidth();
                if channel.bandwidth == expected {
                    continue;
                }
                let old = channel.bandwidth;
                channel.bandwidth = expected;
                queries::update_channel(tx, &channel)?;
                ctx.record_change(
                    "channel",
                    &channel.id.to_string(),
                    EventType::ChannelUpdated,
                    Some(old.as_str().to_string()),
                    Some(expected.as_str().to_string()),
                );
                changed += 1;
            }
            Ok(changed)
        })
    }

    // ==================
    // Contact Operations
    // ==================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        queries::list_contacts(&self.conn)
    }

    /// Look up a contact by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContactNotFound` when no contact has that name.
    pub fn get_contact(&self, name: &str) -> Result<Contact> {
        queries::find_contact(&self.conn, name)?.ok_or_else(|| Error::ContactNotFound {
            name: name.to_string(),
        })
    }

    /// Link every stored channel's talkgroup name to a contact.
    ///
    /// # Errors
    ///
    /// Returns an error if a write fails; nothing is changed in that case.
    pub fn resolve_contacts(&mut self, actor: &str) -> Result<ResolveStats> {
        self.mutate("resolve_contacts", actor, |tx, ctx| {
            let mut channels = queries::list_channels(tx)?;
            let before: Vec<Option<i64>> = channels.iter().map(|c| c.contact_id).collect();

            let mut resolver = ContactResolver::new(&queries::list_contacts(tx)?);
            let stats = resolver.resolve(&mut channels, |contact| {
                let id = queries::insert_contact(tx, contact)?;
                ctx.record_event("contact", &id.to_string(), EventType::ContactPlaceholder);
                Ok(id)
            })?;

            for (channel, old) in channels.iter().zip(before) {
                if channel.contact_id != old {
                    queries::update_channel(tx, channel)?;
                }
            }
            Ok(stats)
        })
    }

    // ==================
    // Collection Operations
    // ==================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_collections(&self, kind: CollectionKind) -> Result<Vec<Collection>> {
        queries::list_collections(&self.conn, kind)
    }

    /// # Errors
    ///
    /// Returns a not-found error naming the kind when absent.
    pub fn get_collection(&self, kind: CollectionKind, name: &str) -> Result<Collection> {
        let id = queries::find_collection(&self.conn, kind, name)?.ok_or_else(|| not_found(kind, name))?;
        Ok(Collection {
            id,
            kind,
            name: name.to_string(),
            member_ids: queries::collection_members(&self.conn, kind, id)?,
        })
    }

    /// Create an empty collection, or return the existing one's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn create_collection(&mut self, kind: CollectionKind, name: &str, actor: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name".to_string(),
                message: format!("{} name is empty", kind.as_str()),
            });
        }
        self.mutate("create_collection", actor, |tx, ctx| {
            let (id, created) = queries::ensure_collection(tx, kind, name.trim())?;
            if created {
                ctx.record_event(kind.as_str(), &id.to_string(), EventType::CollectionCreated);
            }
            Ok(id)
        })
    }

    /// # Errors
    ///
    /// Returns a not-found error when absent.
    pub fn delete_collection(&mut self, kind: CollectionKind, name: &str, actor: &str) -> Result<()> {
        self.mutate("delete_collection", actor, |tx, ctx| {
            if !queries::delete_collection(tx, kind, name)? {
                return Err(not_found(kind, name));
            }
            ctx.record_event(kind.as_str(), name, EventType::CollectionDeleted);
            Ok(())
        })
    }

    /// Set (or with `append`, extend) a collection's members.
    ///
    /// Returns the number of members written.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for an unknown collection and
    /// `Error::Database` for an unknown member id.
    pub fn assign_members(
        &mut self,
        kind: CollectionKind,
        name: &str,
        member_ids: &[i64],
        append: bool,
        actor: &str,
    ) -> Result<usize> {
        self.mutate("assign_members", actor, |tx, ctx| {
            let id = queries::find_collection(tx, kind, name)?.ok_or_else(|| not_found(kind, name))?;
            let written = if append {
                membership::append_members(tx, kind, id, member_ids)?
            } else {
                membership::replace_members(tx, kind, id, member_ids)?
            };
            ctx.record_comment(
                kind.as_str(),
                &id.to_string(),
                EventType::MembersReplaced,
                &format!("{} {written} members", if append { "appended" } else { "set" }),
            );
            Ok(written)
        })
    }

    // ==================
    // Directory Operations
    // ==================

    /// Look up a live directory entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryContactNotFound` when absent or deleted.
    pub fn lookup_directory(&self, dmr_id: i64) -> Result<DirectoryContact> {
        queries::get_directory(&self.conn, dmr_id)?
            .filter(|e| e.deleted_at.is_none())
            .ok_or(Error::DirectoryContactNotFound { dmr_id })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_directory(&self, needle: &str, limit: usize) -> Result<Vec<DirectoryContact>> {
        queries::search_directory(&self.conn, needle, limit)
    }

    /// Soft-delete a directory entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::DirectoryContactNotFound` when absent or already deleted.
    pub fn delete_directory(&mut self, dmr_id: i64, actor: &str) -> Result<()> {
        self.mutate("delete_directory", actor, |tx, ctx| {
            if !queries::soft_delete_directory(tx, dmr_id)? {
                return Err(Error::DirectoryContactNotFound { dmr_id });
            }
            ctx.record_event("directory", &dmr_id.to_string(), EventType::DirectoryDeleted);
            Ok(())
        })
    }

    // ==================
    // Allow List Operations
    // ==================

    /// Replace a named allow list with `ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the old entries survive in that case.
    pub fn import_allow_list(&mut self, name: &str, ids: &HashSet<i64>, actor: &str) -> Result<usize> {
        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable();
        self.mutate("import_allow_list", actor, |tx, ctx| {
            let id = queries::replace_allow_list(tx, name, &sorted)?;
            ctx.record_comment(
                "allow_list",
                &id.to_string(),
                EventType::AllowListImported,
                &format!("{} ids", sorted.len()),
            );
            Ok(sorted.len())
        })
    }

    /// # Errors
    ///
    /// Returns `Error::AllowListNotFound` when no list has this name.
    pub fn allow_list(&self, name: &str) -> Result<HashSet<i64>> {
        queries::allow_list_ids(&self.conn, name)?.ok_or_else(|| Error::AllowListNotFound {
            name: name.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_allow_lists(&self) -> Result<Vec<AllowList>> {
        queries::list_allow_lists(&self.conn)
    }

    // ==================
    // Snapshot and Status
    // ==================

    /// # Errors
    ///
    /// Returns an error if any query fails.
    pub fn load_codeplug(&self) -> Result<Codeplug> {
        queries::load_codeplug(&self.conn)
    }

    /// # Errors
    ///
    /// Returns an error if any query fails.
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let conn = &self.conn;
        let (directory_entries, directory_deleted) = queries::count_directory(conn)?;
        let placeholder_contacts: i64 =
            conn.query_row("SELECT COUNT(*) FROM contacts WHERE dmr_id < 0", [], |row| {
                row.get(0)
            })?;
        Ok(StatusSummary {
            channels: queries::count_rows(conn, "channels")?,
            contacts: queries::count_rows(conn, "contacts")?,
            placeholder_contacts: usize::try_from(placeholder_contacts).unwrap_or(0),
            zones: queries::count_rows(conn, "zones")?,
            scan_lists: queries::count_rows(conn, "scan_lists")?,
            roaming_channels: queries::count_rows(conn, "roaming_channels")?,
            roaming_zones: queries::count_rows(conn, "roaming_zones")?,
            directory_entries,
            directory_deleted,
            allow_lists: queries::count_rows(conn, "allow_lists")?,
        })
    }
}
