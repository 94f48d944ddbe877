//! Channel command implementations.

use crate::cli::commands::{open_storage, print_json};
use crate::cli::ChannelCommands;
use crate::config::resolve_actor;
use crate::error::Result;
use crate::model::Channel;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// Output for channel list.
#[derive(Serialize)]
struct ChannelListOutput {
    channels: Vec<Channel>,
    count: usize,
}

#[derive(Serialize)]
struct ValidateOutput {
    invalid: Vec<crate::storage::InvalidChannel>,
    count: usize,
}

/// Execute channel commands.
///
/// # Errors
///
/// Returns an error if the database is missing, a channel does not exist,
/// or a renumber list does not cover every channel exactly once.
pub fn execute(
    command: &ChannelCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        ChannelCommands::List => list(db_path, json),
        ChannelCommands::Show { id } => show(*id, db_path, json),
        ChannelCommands::Delete { id } => delete(*id, db_path, actor, json),
        ChannelCommands::Reorder { ids } => reorder(ids, db_path, actor, json),
        ChannelCommands::Validate => validate(db_path, json),
        ChannelCommands::FixBandwidths => fix_bandwidths(db_path, actor, json),
    }
}

fn tone_summary(channel: &Channel) -> String {
    let rx = channel.rx_tone.as_deref().or(channel.rx_dcs.as_deref());
    let tx = channel.tx_tone.as_deref().or(channel.tx_dcs.as_deref());
    match (tx, rx) {
        (Some(tx), Some(rx)) if tx == rx => tx.to_string(),
        (Some(tx), Some(rx)) => format!("{tx}/{rx}"),
        (Some(tx), None) => tx.to_string(),
        (None, Some(rx)) => format!("-/{rx}"),
        (None, None) => String::new(),
    }
}

fn list(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let channels = storage.list_channels()?;

    if crate::is_csv() {
        println!("id,name,rx_frequency,tx_frequency,type,bandwidth,power,tone,contact");
        for c in &channels {
            println!(
                "{},{},{:.6},{:.6},{},{},{},{},{}",
                c.id,
                crate::csv_escape(&c.name),
                c.rx_frequency,
                c.tx_frequency,
                c.channel_type.as_str(),
                c.bandwidth.as_str(),
                c.power.as_str(),
                crate::csv_escape(&tone_summary(c)),
                crate::csv_escape(c.tx_contact.as_deref().unwrap_or_default()),
            );
        }
    } else if json {
        print_json(&ChannelListOutput {
            count: channels.len(),
            channels,
        })?;
    } else if channels.is_empty() {
        println!("No channels found.");
    } else {
        println!("Channels ({} found):", channels.len());
        println!();
        for c in &channels {
            let detail = if c.is_dmr() {
                format!(
                    "CC{} TS{} {}",
                    c.color_code,
                    c.time_slot,
                    c.tx_contact.as_deref().unwrap_or("-")
                )
            } else {
                tone_summary(c)
            };
            println!(
                "{:>4}  {:<16} {:>11.5} {:>+8.4}  {:<8} {}",
                c.id.to_string().dimmed(),
                c.name.bold(),
                c.rx_frequency,
                c.offset(),
                c.channel_type.as_str(),
                detail
            );
        }
    }

    Ok(())
}

fn show(id: i64, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let c = storage.get_channel(id)?;

    if json {
        return print_json(&c);
    }

    println!("{} {}", format!("#{}", c.id).dimmed(), c.name.bold());
    println!("  RX:        {:.6} MHz", c.rx_frequency);
    println!("  TX:        {:.6} MHz ({:+.4})", c.tx_frequency, c.offset());
    println!("  Type:      {} ({})", c.channel_type.as_str(), c.protocol.as_str());
    println!("  Bandwidth: {}", c.bandwidth.as_str());
    println!("  Power:     {}", c.power.as_str());
    if c.is_dmr() {
        println!("  Color:     {}", c.color_code);
        println!("  Slot:      {}", c.time_slot);
        if let Some(contact) = &c.tx_contact {
            let link = c
                .contact_id
                .map_or_else(|| "unresolved".yellow().to_string(), |id| format!("contact #{id}"));
            println!("  Contact:   {contact} ({link})");
        }
        if let Some(group) = &c.rx_group {
            println!("  RX group:  {group}");
        }
    } else {
        let tones = tone_summary(&c);
        if !tones.is_empty() {
            println!("  Tone:      {tones} ({})", c.squelch_type.as_str());
        }
    }
    if let Some(scan) = &c.scan_list {
        println!("  Scan list: {scan}");
    }
    if let Some(notes) = &c.notes {
        println!("  Notes:     {notes}");
    }
    if let Err(e) = c.validate() {
        println!("  {} {e}", "Invalid:".red());
    }

    Ok(())
}

fn delete(id: i64, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    storage.delete_channel(id, &actor)?;

    if json {
        let output = serde_json::json!({
            "id": id,
            "deleted": true
        });
        println!("{output}");
    } else {
        println!("Deleted channel: {id}");
    }

    Ok(())
}

fn reorder(ids: &[i64], db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let report = storage.renumber_channels(ids, &actor)?;

    if json {
        print_json(&report)?;
    } else {
        println!("Renumbered {} channels", report.channels);
        println!("  Zone memberships:      {}", report.zone_rows);
        println!("  Scan list memberships: {}", report.scan_list_rows);
    }

    Ok(())
}

fn validate(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let invalid = storage.invalid_channels()?;

    if json {
        return print_json(&ValidateOutput {
            count: invalid.len(),
            invalid,
        });
    }

    if invalid.is_empty() {
        println!("{}", "All channels valid.".green());
    } else {
        println!("{} invalid channels:", invalid.len().to_string().red());
        for bad in &invalid {
            println!("  {:>4}  {:<16} {}", bad.id, bad.name, bad.message);
        }
    }
    Ok(())
}

fn fix_bandwidths(db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);
    let updated = storage.fix_bandwidths(&actor)?;

    if json {
        let output = serde_json::json!({ "updated": updated });
        println!("{output}");
    } else if updated == 0 {
        println!("All bandwidths already match channel types.");
    } else {
        println!("Updated bandwidth on {updated} channels");
    }
    Ok(())
}
