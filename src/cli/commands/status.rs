//! Status command implementation.

use crate::cli::commands::{existing_db_path, print_json};
use crate::error::Result;
use crate::storage::{SqliteStorage, StatusSummary};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    database: String,
    #[serde(flatten)]
    counts: StatusSummary,
}

/// Execute status command.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if there is no database yet.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db_path = existing_db_path(db_path)?;
    let storage = SqliteStorage::open(&db_path)?;
    let counts = storage.status_summary()?;

    if json {
        return print_json(&StatusOutput {
            database: db_path.display().to_string(),
            counts,
        });
    }

    println!("{}", "Codeplug Status".cyan().bold());
    println!("===============");
    println!();
    println!("Database: {}", db_path.display());
    println!();
    println!("Channels:         {}", counts.channels);
    println!("Zones:            {}", counts.zones);
    println!("Scan lists:       {}", counts.scan_lists);
    if counts.placeholder_contacts > 0 {
        println!(
            "Contacts:         {} ({} placeholders)",
            counts.contacts,
            counts.placeholder_contacts.to_string().yellow()
        );
    } else {
        println!("Contacts:         {}", counts.contacts);
    }
    if counts.roaming_channels > 0 || counts.roaming_zones > 0 {
        println!("Roaming channels: {}", counts.roaming_channels);
        println!("Roaming zones:    {}", counts.roaming_zones);
    }
    println!(
        "Directory:        {} ({} deleted)",
        counts.directory_entries, counts.directory_deleted
    );
    println!("Allow lists:      {}", counts.allow_lists);

    if counts.channels == 0 {
        println!();
        println!("No channels yet. Start with: cpm import <file> --dialect auto");
    }

    Ok(())
}
