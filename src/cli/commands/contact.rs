//! Contact command implementations.

use crate::cli::commands::{open_storage, print_json};
use crate::cli::ContactCommands;
use crate::config::resolve_actor;
use crate::error::Result;
use crate::model::Contact;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for contact list.
#[derive(Serialize)]
struct ContactListOutput {
    contacts: Vec<Contact>,
    count: usize,
}

#[derive(Serialize)]
struct ContactShowOutput {
    #[serde(flatten)]
    contact: Contact,
    channels: Vec<String>,
}

/// Execute contact commands.
///
/// # Errors
///
/// Returns an error if the database is missing, a named contact does not
/// exist, or a write fails.
pub fn execute(
    command: &ContactCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        ContactCommands::List => list(db_path, json),
        ContactCommands::Show { name } => show(name, db_path, json),
        ContactCommands::Resolve => resolve(db_path, actor, json),
    }
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let contacts = storage.list_contacts()?;

    if crate::is_csv() {
        println!("id,dmr_id,name,call_type");
        for c in &contacts {
            println!(
                "{},{},{},{}",
                c.id,
                c.dmr_id,
                crate::csv_escape(&c.name),
                c.call_type.as_str()
            );
        }
    } else if json {
        print_json(&ContactListOutput {
            count: contacts.len(),
            contacts,
        })?;
    } else if contacts.is_empty() {
        println!("No contacts found.");
    } else {
        println!("Contacts ({} found):", contacts.len());
        println!();
        for c in &contacts {
            let number = if c.is_placeholder() {
                "unknown".yellow().to_string()
            } else {
                c.dmr_id.to_string()
            };
            println!("{:>9}  {:<24} {}", number, c.name.bold(), c.call_type.label());
        }
    }

    Ok(())
}

fn show(name: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let contact = storage.get_contact(name)?;
    let channels: Vec<String> = storage
        .list_channels()?
        .into_iter()
        .filter(|c| c.contact_id == Some(contact.id))
        .map(|c| c.name)
        .collect();

    if json {
        return print_json(&ContactShowOutput { contact, channels });
    }

    let number = if contact.is_placeholder() {
        format!("{} (placeholder)", contact.dmr_id).yellow().to_string()
    } else {
        contact.dmr_id.to_string()
    };
    println!("{} {}", contact.name.bold(), contact.call_type.label());
    println!("  DMR ID:   {number}");
    if channels.is_empty() {
        println!("  Channels: none");
    } else {
        println!("  Channels: {}", channels.join(", "));
    }
    Ok(())
}

fn resolve(db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let stats = storage.resolve_contacts(&actor)?;

    if json {
        print_json(&stats)?;
    } else {
        println!("Linked {} channels to existing contacts", stats.linked);
        if stats.created > 0 {
            println!(
                "Created {} placeholder contacts; give them real IDs before writing a radio",
                stats.created.to_string().yellow()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ChannelType, Protocol};
    use crate::storage::SqliteStorage;
    use tempfile::TempDir;

    #[test]
    fn test_show_resolved_contact_and_unknown_name() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("codeplug.db");
        crate::cli::commands::init::execute(Some(&db), false, true).unwrap();
        {
            let mut storage = SqliteStorage::open(&db).unwrap();
            let mut ch = crate::model::Channel::new("Digi", 441.0, 446.0);
            ch.protocol = Protocol::Dmr;
            ch.channel_type = ChannelType::DigitalDmr;
            ch.color_code = 1;
            ch.tx_contact = Some("Local 9".into());
            storage.create_channel(&ch, "t").unwrap();
        }

        resolve(Some(&db), None, true).unwrap();
        show("local 9", Some(&db), true).unwrap();

        let err = show("World", Some(&db), true).unwrap_err();
        assert!(matches!(err, Error::ContactNotFound { .. }));
        assert_eq!(err.error_code().as_str(), "CONTACT_NOT_FOUND");
    }
}
