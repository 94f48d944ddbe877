//! Export command implementation.

use crate::cli::commands::{open_storage, parse_dialect, parse_entity, print_json};
use crate::cli::ExportArgs;
use crate::config::resolve_actor;
use crate::error::{Error, Result};
use crate::transfer::{ExportOptions, Exporter};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the export command.
///
/// # Errors
///
/// Returns an error for an unknown or import-only dialect, an unknown zone
/// or allow list, or a write failure.
pub fn execute(
    args: &ExportArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let dialect = parse_dialect(&args.dialect)?.ok_or_else(|| {
        Error::InvalidArgument("export needs an explicit --dialect".to_string())
    })?;
    let options = ExportOptions {
        entity: parse_entity(args.entity.as_deref())?,
        zone: args.zone.clone(),
        contact_limit: args.contact_limit,
        allow_list: args.allow_list.clone(),
        actor: resolve_actor(actor),
        ..ExportOptions::new(dialect)
    };

    let mut storage = open_storage(db_path)?;
    let report = Exporter::new(&mut storage, &options).export(&args.path)?;

    if json {
        return print_json(&report);
    }

    println!(
        "Exported {} to {}",
        report.dialect.to_string().bold(),
        report.path.display()
    );
    for member in &report.members {
        println!(
            "  {:<28} {:>6} rows  {}",
            member.name,
            member.rows,
            member.sha256[..12].dimmed()
        );
    }
    if let Some(manifest) = &report.manifest {
        println!("  Manifest: {}", manifest.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init;
    use crate::model::Channel;
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    fn args(path: PathBuf, dialect: &str) -> ExportArgs {
        ExportArgs {
            path,
            dialect: dialect.to_string(),
            entity: None,
            zone: None,
            contact_limit: None,
            allow_list: None,
        }
    }

    #[test]
    fn test_export_chirp_file() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        init::execute(Some(&db), false, true).unwrap();
        SqliteStorage::open(&db)
            .unwrap()
            .create_channel(&Channel::new("Simplex", 146.52, 146.52), "t")
            .unwrap();

        let out = dir.path().join("radio.csv");
        execute(&args(out.clone(), "chirp"), Some(&db), None, true).unwrap();
        let text = std::fs::read_to_string(out).unwrap();
        assert!(text.contains("Simplex"));
    }

    #[test]
    fn test_export_requires_dialect() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        init::execute(Some(&db), false, true).unwrap();
        let err = execute(&args(dir.path().join("x.csv"), "auto"), Some(&db), None, true)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
