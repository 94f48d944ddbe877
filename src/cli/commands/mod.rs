//! Command implementations.

pub mod allowlist;
pub mod channel;
pub mod completions;
pub mod contact;
pub mod directory;
pub mod export;
pub mod import;
pub mod init;
pub mod status;
pub mod version;
pub mod zone;

use std::path::PathBuf;

use serde::Serialize;

use crate::codec::{Dialect, Entity};
use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Resolve the database path and require that it exists.
pub(crate) fn existing_db_path(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(db_path)
}

/// Open the initialized database.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    SqliteStorage::open(&existing_db_path(db_path)?)
}

/// Parse `--dialect`; "auto" means detect.
pub(crate) fn parse_dialect(value: &str) -> Result<Option<Dialect>> {
    if value.trim().eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    Dialect::parse(value)
        .map(Some)
        .ok_or_else(|| Error::UnknownDialect(value.to_string()))
}

pub(crate) fn parse_entity(value: Option<&str>) -> Result<Option<Entity>> {
    value
        .map(|v| {
            Entity::parse(v).ok_or_else(|| Error::InvalidArgument(format!("unknown entity: {v}")))
        })
        .transpose()
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialect() {
        assert_eq!(parse_dialect("auto").unwrap(), None);
        assert_eq!(parse_dialect("AT890").unwrap(), Some(Dialect::AnyTone));
        assert!(matches!(parse_dialect("baofeng"), Err(Error::UnknownDialect(_))));
    }

    #[test]
    fn test_parse_entity() {
        assert_eq!(parse_entity(None).unwrap(), None);
        assert_eq!(parse_entity(Some("scan-lists")).unwrap(), Some(Entity::ScanLists));
        assert!(matches!(parse_entity(Some("pets")), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_database_is_not_initialized() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(open_storage(Some(&path)), Err(Error::NotInitialized)));
    }
}
