//! Ordered collection membership and global channel renumbering.
//!
//! All functions here run against a connection that is already inside a
//! transaction (see `SqliteStorage::mutate`); a failure anywhere leaves the
//! caller's transaction to roll back.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::CollectionKind;
use crate::storage::queries::count_rows;

/// Lowest temporary offset used while shifting channel ids.
pub const RENUMBER_OFFSET_FLOOR: i64 = 1_000_000;

/// Replace a collection's members with `member_ids`, in order.
///
/// Positions are the list indexes. Repeated ids keep their first position.
/// Running it twice with the same list changes nothing.
///
/// # Errors
///
/// Returns `Error::Database` when a member id does not exist.
pub fn replace_members(
    conn: &Connection,
    kind: CollectionKind,
    collection_id: i64,
    member_ids: &[i64],
) -> Result<usize> {
    conn.execute(
        &format!("DELETE FROM {} WHERE collection_id = ?1", kind.join_table()),
        [collection_id],
    )?;

    let mut seen = HashSet::with_capacity(member_ids.len());
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} (collection_id, member_id, position) VALUES (?1, ?2, ?3)",
        kind.join_table()
    ))?;
    let mut position: i64 = 0;
    for id in member_ids {
        if !seen.insert(*id) {
            continue;
        }
        stmt.execute(params![collection_id, id, position])?;
        position += 1;
    }

    debug!(
        kind = kind.as_str(),
        collection_id,
        members = seen.len(),
        "Replaced collection members"
    );
    Ok(seen.len())
}

/// Add members after the current last position, skipping ones already there.
///
/// Returns how many members were added.
///
/// # Errors
///
/// Returns `Error::Database` when a member id does not exist.
pub fn append_members(
    conn: &Connection,
    kind: CollectionKind,
    collection_id: i64,
    member_ids: &[i64],
) -> Result<usize> {
    let join = kind.join_table();
    let mut next: i64 = conn.query_row(
        &format!("SELECT COALESCE(MAX(position) + 1, 0) FROM {join} WHERE collection_id = ?1"),
        [collection_id],
        |row| row.get(0),
    )?;

    let mut present: HashSet<i64> = conn
        .prepare(&format!("SELECT member_id FROM {join} WHERE collection_id = ?1"))?
        .query_map([collection_id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {join} (collection_id, member_id, position) VALUES (?1, ?2, ?3)"
    ))?;
    let mut added = 0;
    for id in member_ids {
        if !present.insert(*id) {
            continue;
        }
        stmt.execute(params![collection_id, id, next])?;
        next += 1;
        added += 1;
    }
    Ok(added)
}

/// What a renumber touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenumberReport {
    pub channels: usize,
    pub zone_rows: usize,
    pub scan_list_rows: usize,
}

struct MembershipRow {
    collection_id: i64,
    member_id: i64,
    position: i64,
}

fn snapshot(conn: &Connection, kind: CollectionKind) -> Result<Vec<MembershipRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT collection_id, member_id, position FROM {}",
        kind.join_table()
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(MembershipRow {
            collection_id: row.get(0)?,
            member_id: row.get(1)?,
            position: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

fn replay(
    conn: &Connection,
    kind: CollectionKind,
    rows: &[MembershipRow],
    id_map: &HashMap<i64, i64>,
) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} (collection_id, member_id, position) VALUES (?1, ?2, ?3)",
        kind.join_table()
    ))?;
    let mut restored = 0;
    for row in rows {
        let Some(new_id) = id_map.get(&row.member_id) else {
            continue;
        };
        stmt.execute(params![row.collection_id, new_id, row.position])?;
        restored += 1;
    }
    Ok(restored)
}

/// Give channels the ids 1..=n in the order of `ordered_ids`.
///
/// `sort_order` is rewritten to match, and zone and scan-list memberships
/// follow their channels to the new ids.
///
/// # Errors
///
/// Returns `Error::RenumberMismatch` when the list length differs from the
/// channel count and `Error::RenumberInvalid` for duplicate or unknown ids.
/// Both are detected before anything is written.
pub fn renumber_channels(conn: &Connection, ordered_ids: &[i64]) -> Result<RenumberReport> {
    let expected = count_rows(conn, "channels")?;
    if ordered_ids.len() != expected {
        return Err(Error::RenumberMismatch {
            expected,
            actual: ordered_ids.len(),
        });
    }

    let existing: HashSet<i64> = conn
        .prepare("SELECT id FROM channels")?
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(Error::RenumberInvalid(format!("channel {id} is listed twice")));
        }
        if !existing.contains(id) {
            return Err(Error::RenumberInvalid(format!("channel {id} does not exist")));
        }
    }

    let zone_rows = snapshot(conn, CollectionKind::Zone)?;
    let scan_rows = snapshot(conn, CollectionKind::ScanList)?;
    conn.execute("DELETE FROM zone_channels", [])?;
    conn.execute("DELETE FROM scan_list_channels", [])?;

    let max_id = existing.iter().copied().max().unwrap_or(0);
    let offset = RENUMBER_OFFSET_FLOOR.max(max_id + 1);
    conn.execute("UPDATE channels SET id = id + ?1", [offset])?;
    debug!(offset, channels = expected, "Shifted channel ids");

    let mut id_map = HashMap::with_capacity(ordered_ids.len());
    {
        let mut stmt =
            conn.prepare("UPDATE channels SET id = ?1, sort_order = ?1 WHERE id = ?2")?;
        for (i, old_id) in ordered_ids.iter().enumerate() {
            let new_id = i64::try_from(i).unwrap_or(i64::MAX - 1) + 1;
            stmt.execute(params![new_id, old_id + offset])?;
            id_map.insert(*old_id, new_id);
        }
    }

    let report = RenumberReport {
        channels: expected,
        zone_rows: replay(conn, CollectionKind::Zone, &zone_rows, &id_map)?,
        scan_list_rows: replay(conn, CollectionKind::ScanList, &scan_rows, &id_map)?,
    };
    info!(
        channels = report.channels,
        zone_rows = report.zone_rows,
        scan_list_rows = report.scan_list_rows,
        "Renumbered channels"
    );
    Ok(report)
}
