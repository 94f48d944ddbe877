//! Configuration management.
//!
//! Everything is resolved from CLI flags and environment variables; there is
//! no config file.
//!
//! - **Database**: `~/.codeplug/data/codeplug.db` unless overridden
//! - **Directory feed**: the public RadioID dump unless `CPM_DIRECTORY_URL` is set
//! - **Batch size**: directory rows per transaction

use std::path::{Path, PathBuf};

use crate::codec::radioid::DEFAULT_FEED_URL;

/// Directory rows written per transaction when `CPM_BATCH_SIZE` is unset.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Actor recorded in the audit trail when none is given.
pub const DEFAULT_ACTOR: &str = "cli";

/// Get the global codeplug directory location (`~/.codeplug/`).
#[must_use]
pub fn global_codeplug_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".codeplug"))
}

fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `CPM_TEST_DB=1` (or any truthy value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("CPM_TEST_DB").is_ok_and(|v| truthy(&v))
}

/// Get the test database path (`~/.codeplug/test/codeplug.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_codeplug_dir().map(|dir| dir.join("test").join("codeplug.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` / `CPM_DB`), use it directly
/// 2. `CPM_TEST_DB` environment variable → uses test database
/// 3. `CODEPLUG_DB` environment variable
/// 4. Global location: `~/.codeplug/data/codeplug.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no home directory is known.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("CODEPLUG_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_codeplug_dir().map(|dir| dir.join("data").join("codeplug.db"))
}

/// Directory feed URL (`CPM_DIRECTORY_URL`, else the RadioID dump).
#[must_use]
pub fn directory_feed_url() -> String {
    std::env::var("CPM_DIRECTORY_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FEED_URL.to_string())
}

/// Parse a batch size, falling back to the default; never below 1.
#[must_use]
pub fn parse_batch_size(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE)
        .max(1)
}

/// Directory import batch size from `CPM_BATCH_SIZE`.
#[must_use]
pub fn batch_size() -> usize {
    parse_batch_size(std::env::var("CPM_BATCH_SIZE").ok().as_deref())
}

/// Resolve the actor name: explicit `--actor` / `CPM_ACTOR`, else "cli".
#[must_use]
pub fn resolve_actor(explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}
