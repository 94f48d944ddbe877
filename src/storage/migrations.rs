//! Database migrations embedded at compile time.
//!
//! Migrations are sourced from `/migrations/` at the repo root and
//! embedded into the binary using `include_str!`, so the binary carries no
//! runtime file dependencies.

use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// A single migration with version identifier and SQL content.
struct Migration {
    version: &'static str,
    sql: &'static str,
}

/// All migrations in order.
///
/// Version names match the SQL filenames (without .sql extension).
/// The `schema_migrations` table tracks which have been applied.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001_add_channel_options",
        sql: include_str!("../../migrations/001_add_channel_options.sql"),
    },
    Migration {
        version: "002_add_directory_soft_delete",
        sql: include_str!("../../migrations/002_add_directory_soft_delete.sql"),
    },
];

/// Run all pending migrations on the database.
///
/// Already-applied migrations are skipped, so this runs on every open.
///
/// # Errors
///
/// Returns an error if a migration fails to apply. A duplicate-column
/// failure is not an error: the base DDL already carries every column, so
/// a fresh database reports the column as present.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: std::collections::HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in MIGRATIONS {
        if applied.contains(migration.version) {
            continue;
        }

        if let Err(e) = conn.execute_batch(migration.sql) {
            if e.to_string().contains("duplicate column name") {
                debug!(
                    version = migration.version,
                    "Columns already present, marking migration complete"
                );
            } else {
                return Err(e);
            }
        } else {
            info!(version = migration.version, "Applied migration");
        }

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::SCHEMA_SQL;
    use rusqlite::OptionalExtension;

    fn count_applied(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn test_run_migrations_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn).expect("Migrations should apply to fresh database");
        assert_eq!(count_applied(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        run_migrations(&conn).expect("First run should succeed");
        run_migrations(&conn).expect("Second run should succeed");
        assert_eq!(count_applied(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_upgrades_database_without_options_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE channels (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE directory_contacts (dmr_id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO channels (id, name) VALUES (1, 'Old');",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let options: String = conn
            .query_row("SELECT options FROM channels WHERE id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(options, "{}");
        let deleted: Option<i64> = conn
            .query_row(
                "SELECT deleted_at FROM directory_contacts LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .unwrap()
            .flatten();
        assert!(deleted.is_none());
    }
}
