//! Database schema definitions.
//!
//! The base DDL is idempotent; columns added after the first release are
//! also listed in `migrations/` so older databases pick them up.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the codeplug database.
///
/// Timestamps are stored as INTEGER (Unix milliseconds).
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Contacts
-- ====================

-- Talkgroup / private / all-call addresses. Negative dmr_id values are
-- placeholders created for unknown talkgroup names.
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dmr_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    call_type TEXT NOT NULL DEFAULT 'Group'
        CHECK (call_type IN ('Group', 'Private', 'AllCall')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (dmr_id, call_type)
);

CREATE INDEX IF NOT EXISTS idx_contacts_name ON contacts(name);

-- ====================
-- Channels
-- ====================

CREATE TABLE IF NOT EXISTS channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    rx_frequency REAL NOT NULL CHECK (rx_frequency >= 0),
    tx_frequency REAL NOT NULL CHECK (tx_frequency >= 0),
    channel_type TEXT NOT NULL DEFAULT 'Analog',
    protocol TEXT NOT NULL DEFAULT 'FM',
    bandwidth TEXT NOT NULL DEFAULT '25' CHECK (bandwidth IN ('12.5', '25')),
    power TEXT NOT NULL DEFAULT 'High' CHECK (power IN ('High', 'Mid', 'Low')),
    squelch_type TEXT NOT NULL DEFAULT 'None',
    rx_tone TEXT,
    tx_tone TEXT,
    rx_dcs TEXT,
    tx_dcs TEXT,
    color_code INTEGER NOT NULL DEFAULT 0 CHECK (color_code BETWEEN 0 AND 15),
    time_slot INTEGER NOT NULL DEFAULT 1 CHECK (time_slot IN (1, 2)),
    tx_contact TEXT,
    contact_id INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
    rx_group TEXT,
    scan_list TEXT,
    notes TEXT,
    options TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channels_sort ON channels(sort_order, id);
CREATE INDEX IF NOT EXISTS idx_channels_name_freq ON channels(name, rx_frequency);
CREATE INDEX IF NOT EXISTS idx_channels_contact ON channels(contact_id);

-- ====================
-- Zones and Scan Lists
-- ====================

CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS zone_channels (
    collection_id INTEGER NOT NULL REFERENCES zones(id) ON DELETE CASCADE,
    member_id INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection_id, member_id)
);

CREATE INDEX IF NOT EXISTS idx_zone_channels_position ON zone_channels(collection_id, position);

CREATE TABLE IF NOT EXISTS scan_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scan_list_channels (
    collection_id INTEGER NOT NULL REFERENCES scan_lists(id) ON DELETE CASCADE,
    member_id INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection_id, member_id)
);

-- ====================
-- Roaming
-- ====================

CREATE TABLE IF NOT EXISTS roaming_channels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    rx_frequency REAL NOT NULL,
    tx_frequency REAL NOT NULL,
    color_code INTEGER NOT NULL DEFAULT 1 CHECK (color_code BETWEEN 0 AND 15),
    time_slot INTEGER NOT NULL DEFAULT 1 CHECK (time_slot IN (1, 2)),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS roaming_zones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS roaming_zone_channels (
    collection_id INTEGER NOT NULL REFERENCES roaming_zones(id) ON DELETE CASCADE,
    member_id INTEGER NOT NULL REFERENCES roaming_channels(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection_id, member_id)
);

-- ====================
-- Operator Directory
-- ====================

CREATE TABLE IF NOT EXISTS directory_contacts (
    dmr_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    callsign TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    remarks TEXT NOT NULL DEFAULT '',
    deleted_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_directory_callsign ON directory_contacts(callsign);

CREATE TABLE IF NOT EXISTS allow_lists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS allow_list_entries (
    allow_list_id INTEGER NOT NULL REFERENCES allow_lists(id) ON DELETE CASCADE,
    dmr_id INTEGER NOT NULL,
    PRIMARY KEY (allow_list_id, dmr_id)
);

-- ====================
-- Audit Events
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at);
";

/// Apply the schema to a database connection.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", "-64000")?; // 64MB cache
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "channels",
            "contacts",
            "zones",
            "zone_channels",
            "scan_lists",
            "scan_list_channels",
            "roaming_channels",
            "roaming_zones",
            "roaming_zone_channels",
            "directory_contacts",
            "allow_lists",
            "allow_list_entries",
            "events",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_contact_unique_per_call_type() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let insert = |call_type: &str| {
            conn.execute(
                "INSERT INTO contacts (dmr_id, name, call_type, created_at, updated_at)
                 VALUES (91, 'Worldwide', ?1, 0, 0)",
                [call_type],
            )
        };
        assert!(insert("Group").is_ok());
        assert!(insert("Private").is_ok());
        assert!(insert("Group").is_err());
    }

    #[test]
    fn test_membership_cascades_on_channel_delete() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO channels (id, name, rx_frequency, tx_frequency, created_at, updated_at)
                 VALUES (1, 'A', 146.52, 146.52, 0, 0);
             INSERT INTO zones (id, name, created_at, updated_at) VALUES (1, 'Z', 0, 0);
             INSERT INTO zone_channels (collection_id, member_id, position) VALUES (1, 1, 0);
             DELETE FROM channels WHERE id = 1;",
        )
        .unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM zone_channels", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_color_code_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO channels (name, rx_frequency, tx_frequency, color_code, created_at, updated_at)
             VALUES ('Bad', 440.0, 445.0, 16, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }
}
