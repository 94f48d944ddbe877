//! Row-level reads and writes.
//!
//! These functions take a `&Connection` so they run equally against the
//! open connection or inside a `mutate` transaction (a `Transaction` derefs
//! to `Connection`). They never open transactions of their own.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::model::{
    AllowList, Bandwidth, CallType, Channel, ChannelOptions, ChannelType, Codeplug, Collection,
    CollectionKind, Contact, DirectoryContact, Grouping, Power, Protocol, RoamingChannel,
    SquelchType,
};

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ==================
// Channels
// ==================

const CHANNEL_COLUMNS: &str = "id, sort_order, name, rx_frequency, tx_frequency, channel_type, \
     protocol, bandwidth, power, squelch_type, rx_tone, tx_tone, rx_dcs, tx_dcs, color_code, \
     time_slot, tx_contact, contact_id, rx_group, scan_list, notes, options";

fn channel_from_row(row: &Row) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        sort_order: row.get(1)?,
        name: row.get(2)?,
        rx_frequency: row.get(3)?,
        tx_frequency: row.get(4)?,
        channel_type: ChannelType::from_str(&row.get::<_, String>(5)?),
        protocol: Protocol::from_str(&row.get::<_, String>(6)?),
        bandwidth: Bandwidth::from_str(&row.get::<_, String>(7)?),
        power: Power::from_str(&row.get::<_, String>(8)?),
        squelch_type: SquelchType::from_str(&row.get::<_, String>(9)?),
        rx_tone: row.get(10)?,
        tx_tone: row.get(11)?,
        rx_dcs: row.get(12)?,
        tx_dcs: row.get(13)?,
        color_code: row.get(14)?,
        time_slot: row.get(15)?,
        tx_contact: row.get(16)?,
        contact_id: row.get(17)?,
        rx_group: row.get(18)?,
        scan_list: row.get(19)?,
        notes: row.get(20)?,
        options: ChannelOptions::from_json(&row.get::<_, String>(21)?),
    })
}

/// All channels in display order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_channels(conn: &Connection) -> Result<Vec<Channel>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY sort_order, id"
    ))?;
    let rows = stmt.query_map([], channel_from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn get_channel(conn: &Connection, id: i64) -> Result<Option<Channel>> {
    let channel = conn
        .query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
            [id],
            channel_from_row,
        )
        .optional()?;
    Ok(channel)
}

/// Insert a channel and return its id.
///
/// A zero `sort_order` places the channel after every existing one.
///
/// # Errors
///
/// Returns an error if the insert violates a constraint.
pub fn insert_channel(conn: &Connection, channel: &Channel) -> Result<i64> {
    let now = now_ms();
    let sort_order = if channel.sort_order > 0 {
        channel.sort_order
    } else {
        conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM channels",
            [],
            |row| row.get(0),
        )?
    };
    conn.execute(
        "INSERT INTO channels (sort_order, name, rx_frequency, tx_frequency, channel_type, protocol,
             bandwidth, power, squelch_type, rx_tone, tx_tone, rx_dcs, tx_dcs, color_code, time_slot,
             tx_contact, contact_id, rx_group, scan_list, notes, options, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
             ?19, ?20, ?21, ?22, ?22)",
        params![
            sort_order,
            channel.name,
            channel.rx_frequency,
            channel.tx_frequency,
            channel.channel_type.as_str(),
            channel.protocol.as_str(),
            channel.bandwidth.as_str(),
            channel.power.as_str(),
            channel.squelch_type.as_str(),
            channel.rx_tone,
            channel.tx_tone,
            channel.rx_dcs,
            channel.tx_dcs,
            channel.color_code,
            channel.time_slot,
            channel.tx_contact,
            channel.contact_id,
            channel.rx_group,
            channel.scan_list,
            channel.notes,
            channel.options.to_json()?,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every stored field of an existing channel.
///
/// # Errors
///
/// Returns an error if the update violates a constraint.
pub fn update_channel(conn: &Connection, channel: &Channel) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE channels SET sort_order = ?2, name = ?3, rx_frequency = ?4, tx_frequency = ?5,
             channel_type = ?6, protocol = ?7, bandwidth = ?8, power = ?9, squelch_type = ?10,
             rx_tone = ?11, tx_tone = ?12, rx_dcs = ?13, tx_dcs = ?14, color_code = ?15,
             time_slot = ?16, tx_contact = ?17, contact_id = ?18, rx_group = ?19, scan_list = ?20,
             notes = ?21, options = ?22, updated_at = ?23
         WHERE id = ?1",
        params![
            channel.id,
            channel.sort_order,
            channel.name,
            channel.rx_frequency,
            channel.tx_frequency,
            channel.channel_type.as_str(),
            channel.protocol.as_str(),
            channel.bandwidth.as_str(),
            channel.power.as_str(),
            channel.squelch_type.as_str(),
            channel.rx_tone,
            channel.tx_tone,
            channel.rx_dcs,
            channel.tx_dcs,
            channel.color_code,
            channel.time_slot,
            channel.tx_contact,
            channel.contact_id,
            channel.rx_group,
            channel.scan_list,
            channel.notes,
            channel.options.to_json()?,
            now_ms(),
        ],
    )?;
    Ok(changed)
}

/// Whether a channel with this name and receive frequency exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn channel_exists(conn: &Connection, name: &str, rx_frequency: f64) -> Result<bool> {
    let exists = conn
        .prepare_cached(
            "SELECT 1 FROM channels WHERE name = ?1 AND abs(rx_frequency - ?2) < 0.0000005",
        )?
        .exists(params![name, rx_frequency])?;
    Ok(exists)
}

/// Delete every channel and restart id assignment at 1.
///
/// Memberships go with them through the cascade.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn clear_channels(conn: &Connection) -> Result<usize> {
    let removed = conn.execute("DELETE FROM channels", [])?;
    conn.execute("DELETE FROM sqlite_sequence WHERE name = 'channels'", [])?;
    Ok(removed)
}

// ==================
// Contacts
// ==================

fn contact_from_row(row: &Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        dmr_id: row.get(1)?,
        name: row.get(2)?,
        call_type: CallType::from_str(&row.get::<_, String>(3)?),
    })
}

/// Contacts ordered by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_contacts(conn: &Connection) -> Result<Vec<Contact>> {
    let mut stmt =
        conn.prepare("SELECT id, dmr_id, name, call_type FROM contacts ORDER BY name, id")?;
    let rows = stmt.query_map([], contact_from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// First contact whose name matches case-insensitively.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_contact(conn: &Connection, name: &str) -> Result<Option<Contact>> {
    Ok(conn
        .query_row(
            "SELECT id, dmr_id, name, call_type FROM contacts
             WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
            [name.trim()],
            contact_from_row,
        )
        .optional()?)
}

/// Insert a contact and return its id.
///
/// # Errors
///
/// Returns an error if `(dmr_id, call_type)` already exists.
pub fn insert_contact(conn: &Connection, contact: &Contact) -> Result<i64> {
    let now = now_ms();
    conn.execute(
        "INSERT INTO contacts (dmr_id, name, call_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![contact.dmr_id, contact.name, contact.call_type.as_str(), now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert or rename a contact keyed by `(dmr_id, call_type)`.
///
/// Returns the row id and whether the row is new.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert_contact(conn: &Connection, contact: &Contact) -> Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM contacts WHERE dmr_id = ?1 AND call_type = ?2",
            params![contact.dmr_id, contact.call_type.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE contacts SET name = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, contact.name, now_ms()],
            )?;
            Ok((id, false))
        }
        None => Ok((insert_contact(conn, contact)?, true)),
    }
}

// ==================
// Roaming Channels
// ==================

fn roaming_from_row(row: &Row) -> rusqlite::Result<RoamingChannel> {
    Ok(RoamingChannel {
        id: row.get(0)?,
        name: row.get(1)?,
        rx_frequency: row.get(2)?,
        tx_frequency: row.get(3)?,
        color_code: row.get(4)?,
        time_slot: row.get(5)?,
    })
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn list_roaming_channels(conn: &Connection) -> Result<Vec<RoamingChannel>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, rx_frequency, tx_frequency, color_code, time_slot
         FROM roaming_channels ORDER BY id",
    )?;
    let rows = stmt.query_map([], roaming_from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Insert or refresh a roaming channel keyed by name.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert_roaming_channel(conn: &Connection, rc: &RoamingChannel) -> Result<(i64, bool)> {
    let now = now_ms();
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM roaming_channels WHERE name = ?1",
            [&rc.name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        conn.execute(
            "UPDATE roaming_channels SET rx_frequency = ?2, tx_frequency = ?3, color_code = ?4,
                 time_slot = ?5, updated_at = ?6
             WHERE id = ?1",
            params![id, rc.rx_frequency, rc.tx_frequency, rc.color_code, rc.time_slot, now],
        )?;
        return Ok((id, false));
    }

    conn.execute(
        "INSERT INTO roaming_channels (name, rx_frequency, tx_frequency, color_code, time_slot,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![rc.name, rc.rx_frequency, rc.tx_frequency, rc.color_code, rc.time_slot, now],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

// ==================
// Collections
// ==================

/// Member name → id for the member table of `kind`.
///
/// When names repeat, the first in display order wins.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn member_ids_by_name(conn: &Connection, kind: CollectionKind) -> Result<HashMap<String, i64>> {
    let sql = match kind {
        CollectionKind::Zone | CollectionKind::ScanList => {
            "SELECT id, name FROM channels ORDER BY sort_order DESC, id DESC"
        }
        CollectionKind::RoamingZone => "SELECT id, name FROM roaming_channels ORDER BY id DESC",
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?;
    // Reverse order so earlier rows overwrite later ones
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn find_collection(conn: &Connection, kind: CollectionKind, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", kind.table()),
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Find a collection by name, creating it when missing.
///
/// Returns the id and whether it was created.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn ensure_collection(conn: &Connection, kind: CollectionKind, name: &str) -> Result<(i64, bool)> {
    if let Some(id) = find_collection(conn, kind, name)? {
        return Ok((id, false));
    }
    let now = now_ms();
    conn.execute(
        &format!(
            "INSERT INTO {} (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            kind.table()
        ),
        params![name, now],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

/// Member ids of one collection in position order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn collection_members(conn: &Connection, kind: CollectionKind, id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT member_id FROM {} WHERE collection_id = ?1 ORDER BY position, member_id",
        kind.join_table()
    ))?;
    let rows = stmt.query_map([id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// All collections of a kind, with members.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_collections(conn: &Connection, kind: CollectionKind) -> Result<Vec<Collection>> {
    let mut stmt = conn.prepare(&format!("SELECT id, name FROM {} ORDER BY id", kind.table()))?;
    let heads: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<_>>()?;

    heads
        .into_iter()
        .map(|(id, name)| {
            Ok(Collection {
                id,
                kind,
                name,
                member_ids: collection_members(conn, kind, id)?,
            })
        })
        .collect()
}

/// Delete a collection by name; memberships cascade.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_collection(conn: &Connection, kind: CollectionKind, name: &str) -> Result<bool> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE name = ?1", kind.table()),
        [name],
    )?;
    Ok(removed > 0)
}

// ==================
// Directory
// ==================

fn directory_from_row(row: &Row) -> rusqlite::Result<DirectoryContact> {
    Ok(DirectoryContact {
        dmr_id: row.get(0)?,
        name: row.get(1)?,
        callsign: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        country: row.get(5)?,
        remarks: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

const DIRECTORY_COLUMNS: &str = "dmr_id, name, callsign, city, state, country, remarks, deleted_at";

/// Insert or refresh a directory entry.
///
/// A soft-deleted entry is resurrected: `deleted_at` is cleared and the
/// fields are replaced. Returns whether the row is new.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert_directory(conn: &Connection, entry: &DirectoryContact) -> Result<bool> {
    let now = now_ms();
    let existed = conn
        .prepare_cached("SELECT 1 FROM directory_contacts WHERE dmr_id = ?1")?
        .exists([entry.dmr_id])?;
    conn.prepare_cached(
        "INSERT INTO directory_contacts (dmr_id, name, callsign, city, state, country, remarks,
             deleted_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?8)
         ON CONFLICT(dmr_id) DO UPDATE SET
             name = excluded.name,
             callsign = excluded.callsign,
             city = excluded.city,
             state = excluded.state,
             country = excluded.country,
             remarks = excluded.remarks,
             deleted_at = NULL,
             updated_at = excluded.updated_at",
    )?
    .execute(params![
        entry.dmr_id,
        entry.name,
        entry.callsign,
        entry.city,
        entry.state,
        entry.country,
        entry.remarks,
        now,
    ])?;
    Ok(!existed)
}

/// Look up one entry, including soft-deleted ones.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_directory(conn: &Connection, dmr_id: i64) -> Result<Option<DirectoryContact>> {
    let entry = conn
        .query_row(
            &format!("SELECT {DIRECTORY_COLUMNS} FROM directory_contacts WHERE dmr_id = ?1"),
            [dmr_id],
            directory_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Live entries ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_directory(conn: &Connection, limit: Option<usize>) -> Result<Vec<DirectoryContact>> {
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let mut stmt = conn.prepare(&format!(
        "SELECT {DIRECTORY_COLUMNS} FROM directory_contacts
         WHERE deleted_at IS NULL ORDER BY dmr_id LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit], directory_from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Search live entries by call sign prefix or name substring.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn search_directory(conn: &Connection, needle: &str, limit: usize) -> Result<Vec<DirectoryContact>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DIRECTORY_COLUMNS} FROM directory_contacts
         WHERE deleted_at IS NULL
           AND (callsign LIKE ?1 || '%' OR name LIKE '%' || ?1 || '%')
         ORDER BY callsign, dmr_id LIMIT ?2"
    ))?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![needle, limit], directory_from_row)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Mark an entry deleted. Returns false when it is absent or already deleted.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn soft_delete_directory(conn: &Connection, dmr_id: i64) -> Result<bool> {
    let now = now_ms();
    let changed = conn.execute(
        "UPDATE directory_contacts SET deleted_at = ?2, updated_at = ?2
         WHERE dmr_id = ?1 AND deleted_at IS NULL",
        params![dmr_id, now],
    )?;
    Ok(changed > 0)
}

/// (live, soft-deleted) entry counts.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_directory(conn: &Connection) -> Result<(usize, usize)> {
    let (live, deleted): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(deleted_at IS NULL), 0), COALESCE(SUM(deleted_at IS NOT NULL), 0)
         FROM directory_contacts",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((
        usize::try_from(live).unwrap_or(0),
        usize::try_from(deleted).unwrap_or(0),
    ))
}

// ==================
// Allow Lists
// ==================

/// Replace the entries of a named allow list, creating it when missing.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn replace_allow_list(conn: &Connection, name: &str, ids: &[i64]) -> Result<i64> {
    let now = now_ms();
    conn.execute(
        "INSERT INTO allow_lists (name, created_at, updated_at) VALUES (?1, ?2, ?2)
         ON CONFLICT(name) DO UPDATE SET updated_at = excluded.updated_at",
        params![name, now],
    )?;
    let list_id: i64 = conn.query_row(
        "SELECT id FROM allow_lists WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    conn.execute("DELETE FROM allow_list_entries WHERE allow_list_id = ?1", [list_id])?;

    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO allow_list_entries (allow_list_id, dmr_id) VALUES (?1, ?2)",
    )?;
    for id in ids {
        stmt.execute(params![list_id, id])?;
    }
    Ok(list_id)
}

/// IDs in a named allow list, or `None` when no such list exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn allow_list_ids(conn: &Connection, name: &str) -> Result<Option<HashSet<i64>>> {
    let Some(list_id) = conn
        .query_row(
            "SELECT id FROM allow_lists WHERE name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
    else {
        return Ok(None);
    };
    let mut stmt = conn.prepare("SELECT dmr_id FROM allow_list_entries WHERE allow_list_id = ?1")?;
    let ids = stmt
        .query_map([list_id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(Some(ids))
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn list_allow_lists(conn: &Connection) -> Result<Vec<AllowList>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.name, COUNT(e.dmr_id), l.created_at, l.updated_at
         FROM allow_lists l
         LEFT JOIN allow_list_entries e ON e.allow_list_id = l.id
         GROUP BY l.id ORDER BY l.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(AllowList {
            id: row.get(0)?,
            name: row.get(1)?,
            entry_count: usize::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

// ==================
// Counts and Snapshot
// ==================

/// Row count of a table.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn groupings(
    conn: &Connection,
    kind: CollectionKind,
    names: &HashMap<i64, String>,
) -> Result<Vec<Grouping>> {
    Ok(list_collections(conn, kind)?
        .into_iter()
        .map(|c| {
            let members = c
                .member_ids
                .iter()
                .filter_map(|id| names.get(id).cloned())
                .collect();
            Grouping::new(c.name, members)
        })
        .collect())
}

/// Load everything an encoder needs, with memberships resolved to names.
///
/// # Errors
///
/// Returns an error if any query fails.
pub fn load_codeplug(conn: &Connection) -> Result<Codeplug> {
    let channels = list_channels(conn)?;
    let roaming_channels = list_roaming_channels(conn)?;

    let channel_names: HashMap<i64, String> =
        channels.iter().map(|c| (c.id, c.name.clone())).collect();
    let roaming_names: HashMap<i64, String> = roaming_channels
        .iter()
        .map(|c| (c.id, c.name.clone()))
        .collect();

    Ok(Codeplug {
        zones: groupings(conn, CollectionKind::Zone, &channel_names)?,
        scan_lists: groupings(conn, CollectionKind::ScanList, &channel_names)?,
        roaming_zones: groupings(conn, CollectionKind::RoamingZone, &roaming_names)?,
        contacts: list_contacts(conn)?,
        directory: list_directory(conn, None)?,
        channels,
        roaming_channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    fn db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_channel_insert_and_read_back() {
        let conn = db();
        let mut ch = Channel::new("Repeater", 146.94, 146.34);
        ch.options.squelch_level = Some(5);
        let id = insert_channel(&conn, &ch).unwrap();

        let stored = get_channel(&conn, id).unwrap().unwrap();
        assert_eq!(stored.name, "Repeater");
        assert_eq!(stored.sort_order, 1);
        assert_eq!(stored.options.squelch_level, Some(5));
        assert!(channel_exists(&conn, "Repeater", 146.94).unwrap());
        assert!(!channel_exists(&conn, "Repeater", 146.52).unwrap());
    }

    #[test]
    fn test_clear_channels_resets_ids() {
        let conn = db();
        insert_channel(&conn, &Channel::new("A", 146.52, 146.52)).unwrap();
        insert_channel(&conn, &Channel::new("B", 146.55, 146.55)).unwrap();
        assert_eq!(clear_channels(&conn).unwrap(), 2);

        let id = insert_channel(&conn, &Channel::new("C", 146.58, 146.58)).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_upsert_contact_keys_on_id_and_type() {
        let conn = db();
        let (a, created) = upsert_contact(&conn, &Contact::new(91, "World", CallType::Group)).unwrap();
        assert!(created);
        let (b, created) =
            upsert_contact(&conn, &Contact::new(91, "Worldwide", CallType::Group)).unwrap();
        assert!(!created);
        assert_eq!(a, b);
        let (_, created) =
            upsert_contact(&conn, &Contact::new(91, "Someone", CallType::Private)).unwrap();
        assert!(created);

        let contacts = list_contacts(&conn).unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().any(|c| c.name == "Worldwide"));
    }

    #[test]
    fn test_directory_resurrection() {
        let conn = db();
        let mut entry = DirectoryContact {
            dmr_id: 666,
            name: "Old Name".into(),
            callsign: "N0EVL".into(),
            ..Default::default()
        };
        assert!(upsert_directory(&conn, &entry).unwrap());
        assert!(soft_delete_directory(&conn, 666).unwrap());
        assert!(!soft_delete_directory(&conn, 666).unwrap());
        assert_eq!(count_directory(&conn).unwrap(), (0, 1));
        assert!(list_directory(&conn, None).unwrap().is_empty());

        entry.name = "New Name".into();
        assert!(!upsert_directory(&conn, &entry).unwrap());

        let stored = get_directory(&conn, 666).unwrap().unwrap();
        assert_eq!(stored.deleted_at, None);
        assert_eq!(stored.name, "New Name");
        assert_eq!(count_directory(&conn).unwrap(), (1, 0));
    }

    #[test]
    fn test_allow_list_replace() {
        let conn = db();
        replace_allow_list(&conn, "local", &[1, 2, 3]).unwrap();
        replace_allow_list(&conn, "local", &[3, 4]).unwrap();

        let ids = allow_list_ids(&conn, "local").unwrap().unwrap();
        assert_eq!(ids, [3, 4].into_iter().collect());
        assert!(allow_list_ids(&conn, "missing").unwrap().is_none());

        let lists = list_allow_lists(&conn).unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].entry_count, 2);
    }

    #[test]
    fn test_member_ids_by_name_prefers_first() {
        let conn = db();
        let first = insert_channel(&conn, &Channel::new("Dup", 146.52, 146.52)).unwrap();
        insert_channel(&conn, &Channel::new("Dup", 446.0, 446.0)).unwrap();

        let names = member_ids_by_name(&conn, CollectionKind::Zone).unwrap();
        assert_eq!(names.get("Dup"), Some(&first));
    }

    #[test]
    fn test_load_codeplug_resolves_member_names() {
        let conn = db();
        let a = insert_channel(&conn, &Channel::new("A", 146.52, 146.52)).unwrap();
        let b = insert_channel(&conn, &Channel::new("B", 146.55, 146.55)).unwrap();
        let (zone, _) = ensure_collection(&conn, CollectionKind::Zone, "Local").unwrap();
        conn.execute(
            "INSERT INTO zone_channels (collection_id, member_id, position) VALUES (?1, ?2, 0), (?1, ?3, 1)",
            params![zone, b, a],
        )
        .unwrap();

        let plug = load_codeplug(&conn).unwrap();
        assert_eq!(plug.channels.len(), 2);
        assert_eq!(plug.zones, vec![Grouping::new("Local", vec!["B".into(), "A".into()])]);
    }
}
