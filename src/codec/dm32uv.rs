//! DM32UV CPS layout.
//!
//! Same concepts as the AnyTone set under different labels. Decoding accepts
//! either vendor's spelling of a column so files edited in other tools still
//! import.

use crate::model::{
    Bandwidth, CallType, Channel, ChannelOptions, Contact, DirectoryContact, Grouping,
    RoamingChannel,
};
use crate::normalize::{
    classify_mode, dcs_label, map_power, parse_bandwidth, parse_color_code, parse_flag,
    parse_frequency, parse_time_slot, split_tone_code, SquelchCandidates,
};

use super::table::{Aliases, Decoded, HeaderIndex, RawTable};
use super::{
    decode_directory, decode_groupings, decode_roaming_channels as decode_roaming, encode_groupings,
    finish_channel, reference, DirectoryColumns, RoamingColumns,
};

/// Digital contact rows written when no explicit limit is given.
pub const DEFAULT_CONTACT_LIMIT: usize = 50_000;

const NAME: Aliases = &["Channel Name", "Name"];
const CHANNEL_TYPE: Aliases = &["Channel Type", "Type"];
const RX_FREQ: Aliases = &["RX Frequency[MHz]", "RX Frequency", "Receive Frequency"];
const TX_FREQ: Aliases = &["TX Frequency[MHz]", "TX Frequency", "Transmit Frequency"];
const POWER: Aliases = &["Power", "Transmit Power"];
const BANDWIDTH: Aliases = &["Band Width", "Bandwidth"];
const SCAN_LIST: Aliases = &["Scan List"];
const TX_ADMIT: Aliases = &["TX Admit"];
const SQUELCH_LEVEL: Aliases = &["Squelch Level"];
const APRS_REPORT_TYPE: Aliases = &["APRS Report Type"];
const FORBID_TX: Aliases = &["Forbid TX"];
const APRS_RECEIVE: Aliases = &["APRS Receive"];
const FORBID_TALKAROUND: Aliases = &["Forbid Talkaround"];
const AUTO_SCAN: Aliases = &["Auto Scan"];
const LONE_WORK: Aliases = &["Lone Work"];
const EMERGENCY_INDICATOR: Aliases = &["Emergency Indicator"];
const EMERGENCY_ACK: Aliases = &["Emergency ACK"];
const TX_CONTACT: Aliases = &["TX Contact", "Contact/Talk Group", "Contacts"];
const RX_GROUP: Aliases = &["RX Group List", "Receive Group List", "RX Group"];
const COLOR_CODE: Aliases = &["Color Code", "RX Color Code", "RX CC"];
const TIME_SLOT: Aliases = &["Time Slot", "Slot", "RX TS"];
const DECODE: Aliases = &["CTC/DCS Decode", "CTCSS/DCS Decode"];
const ENCODE: Aliases = &["CTC/DCS Encode", "CTCSS/DCS Encode"];

const TG_NAME: Aliases = &["Name"];
const TG_ID: Aliases = &["ID", "Radio ID"];
const TG_TYPE: Aliases = &["Type", "Call Type"];

const ZONE_NAME: Aliases = &["Zone Name", "Name"];
const MEMBERS: Aliases = &["Channel Members", "Zone Channel Member", "Scan Channel Member"];
const SCAN_NAME: Aliases = &["Scan List Name", "Name"];

const ROAM_CHANNEL: RoamingColumns = RoamingColumns {
    name: &["Channel Name", "Name"],
    rx: &["RX Frequency", "RX Frequency[MHz]", "Receive Frequency"],
    tx: &["TX Frequency", "TX Frequency[MHz]", "Transmit Frequency"],
    color_code: &["Color Code"],
    time_slot: &["Time Slot", "Slot"],
};

const DIGITAL_CONTACT: DirectoryColumns = DirectoryColumns {
    dmr_id: &["ID", "Radio ID"],
    callsign: &["Repeater", "Callsign"],
    name: &["Name"],
    city: &["City"],
    state: &["Province", "State"],
    country: &["Country"],
    remarks: &["Remark", "Remarks"],
};

pub const CHANNEL_HEADERS: &[&str] = &[
    "No.",
    "Channel Name",
    "Channel Type",
    "RX Frequency[MHz]",
    "TX Frequency[MHz]",
    "Power",
    "Band Width",
    "Scan List",
    "TX Admit",
    "Emergency System",
    "Squelch Level",
    "APRS Report Type",
    "Forbid TX",
    "APRS Receive",
    "Forbid Talkaround",
    "Auto Scan",
    "Lone Work",
    "Emergency Indicator",
    "Emergency ACK",
    "Analog APRS PTT Mode",
    "Digital APRS PTT Mode",
    "TX Contact",
    "RX Group List",
    "Color Code",
    "Time Slot",
    "Encryption",
    "Encryption ID",
    "APRS Report Channel",
    "Direct Dual Mode",
    "Private Confirm",
    "Short Data Confirm",
    "DMR ID",
    "CTC/DCS Decode",
    "CTC/DCS Encode",
    "Scramble",
    "RX Squelch Mode",
    "Signaling Type",
    "PTT ID",
    "VOX Function",
    "PTT ID Display",
];

pub const TALKGROUP_HEADERS: &[&str] = &["No.", "Name", "ID", "Type"];
pub const ZONE_HEADERS: &[&str] = &["No.", "Zone Name", "Channel Members"];
pub const SCAN_LIST_HEADERS: &[&str] = &["No.", "Scan List Name", "Channel Members"];
pub const DIGITAL_CONTACT_HEADERS: &[&str] = &[
    "No.",
    "ID",
    "Repeater",
    "Name",
    "City",
    "Province",
    "Country",
    "Remark",
    "Type",
    "Alert Call",
];
pub const ROAM_CHANNEL_HEADERS: &[&str] = &[
    "No.",
    "Channel Name",
    "RX Frequency",
    "TX Frequency",
    "Color Code",
    "Time Slot",
];
pub const ROAM_ZONE_HEADERS: &[&str] = &["No.", "Zone Name", "Channel Members"];

/// Whether a header looks like a DM32UV channel export.
#[must_use]
pub fn sniff_channels(index: &HeaderIndex) -> bool {
    index.has(&["RX Frequency[MHz]"]) || (index.has(NAME) && index.has(TX_ADMIT))
}

// ── Channels ─────────────────────────────────────────────────

#[must_use]
pub fn decode_channels(table: &RawTable) -> Decoded<Channel> {
    Decoded::collect(table, decode_channel)
}

fn decode_channel(index: &HeaderIndex, row: &[String]) -> std::result::Result<Option<Channel>, String> {
    let name = index.get(row, NAME).ok_or("missing channel name")?;
    let rx = index
        .get(row, RX_FREQ)
        .and_then(parse_frequency)
        .ok_or_else(|| format!("channel '{name}' has no usable receive frequency"))?;
    let tx = index.get(row, TX_FREQ).and_then(parse_frequency).unwrap_or(rx);

    let mode = classify_mode(index.text(row, CHANNEL_TYPE));
    let forbid_tx = parse_flag(index.text(row, FORBID_TX))
        || index.text(row, TX_ADMIT).eq_ignore_ascii_case("forbid tx");
    let mut channel = Channel {
        channel_type: mode.channel_type,
        protocol: mode.protocol,
        bandwidth: index
            .get(row, BANDWIDTH)
            .and_then(parse_bandwidth)
            .unwrap_or(mode.bandwidth),
        power: map_power(index.text(row, POWER)),
        scan_list: reference(index.get(row, SCAN_LIST)),
        options: ChannelOptions {
            squelch_level: index.get(row, SQUELCH_LEVEL).and_then(|s| s.parse().ok()),
            aprs_report_type: reference(index.get(row, APRS_REPORT_TYPE)),
            forbid_tx,
            aprs_receive: parse_flag(index.text(row, APRS_RECEIVE)),
            forbid_talkaround: parse_flag(index.text(row, FORBID_TALKAROUND)),
            auto_scan: parse_flag(index.text(row, AUTO_SCAN)),
            lone_work: parse_flag(index.text(row, LONE_WORK)),
            emergency_indicator: parse_flag(index.text(row, EMERGENCY_INDICATOR)),
            emergency_ack: parse_flag(index.text(row, EMERGENCY_ACK)),
            ..ChannelOptions::default()
        },
        ..Channel::new(name, rx, tx)
    };

    if channel.is_dmr() {
        channel.color_code = match index.get(row, COLOR_CODE) {
            Some(raw) => parse_color_code(raw).unwrap_or(0),
            None => 1,
        };
        channel.time_slot = index.get(row, TIME_SLOT).and_then(parse_time_slot).unwrap_or(1);
        channel.tx_contact = reference(index.get(row, TX_CONTACT));
        channel.rx_group = reference(index.get(row, RX_GROUP));
    }

    let mut candidates = SquelchCandidates::default();
    candidates.set_rx(index.get(row, DECODE).and_then(split_tone_code));
    candidates.set_tx(index.get(row, ENCODE).and_then(split_tone_code));
    candidates.reconcile().apply(&mut channel);

    finish_channel(channel)
}

fn flag(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

fn tone_or_none(tone: Option<&String>, dcs: Option<&String>) -> String {
    tone.cloned()
        .or_else(|| dcs.map(|d| dcs_label(d)))
        .unwrap_or_else(|| "None".to_string())
}

#[must_use]
pub fn encode_channels(channels: &[Channel]) -> RawTable {
    let none = || "None".to_string();
    let mut table = RawTable::with_headers(CHANNEL_HEADERS);
    for (i, ch) in channels.iter().enumerate() {
        let opts = &ch.options;
        table.push_row(vec![
            (i + 1).to_string(),
            ch.name.clone(),
            if ch.is_dmr() { "Digital" } else { "Analog" }.to_string(),
            format!("{:.5}", ch.rx_frequency),
            format!("{:.5}", ch.tx_frequency),
            ch.power.as_str().to_string(),
            match ch.bandwidth {
                Bandwidth::Narrow => "12.5KHz",
                Bandwidth::Wide => "25KHz",
            }
            .to_string(),
            ch.scan_list.clone().unwrap_or_else(none),
            if opts.forbid_tx { "Forbid TX" } else { "Allow TX" }.to_string(),
            none(),
            opts.squelch_level.unwrap_or(3).to_string(),
            opts.aprs_report_type.clone().unwrap_or_else(|| "Off".to_string()),
            flag(opts.forbid_tx),
            flag(opts.aprs_receive),
            flag(opts.forbid_talkaround),
            flag(opts.auto_scan),
            flag(opts.lone_work),
            flag(opts.emergency_indicator),
            flag(opts.emergency_ack),
            "0".to_string(),
            "0".to_string(),
            ch.tx_contact.clone().unwrap_or_else(none),
            ch.rx_group.clone().unwrap_or_else(none),
            ch.color_code.to_string(),
            format!("Slot {}", ch.time_slot.max(1)),
            "0".to_string(),
            none(),
            "1".to_string(),
            "0".to_string(),
            "0".to_string(),
            "0".to_string(),
            none(),
            tone_or_none(ch.rx_tone.as_ref(), ch.rx_dcs.as_ref()),
            tone_or_none(ch.tx_tone.as_ref(), ch.tx_dcs.as_ref()),
            none(),
            "Carrier/CTC".to_string(),
            none(),
            "OFF".to_string(),
            "0".to_string(),
            "0".to_string(),
        ]);
    }
    table
}

// ── Talkgroups ───────────────────────────────────────────────

#[must_use]
pub fn decode_talkgroups(table: &RawTable) -> Decoded<Contact> {
    Decoded::collect(table, |index, row| {
        let name = index.get(row, TG_NAME).ok_or("missing talkgroup name")?;
        let id = index.text(row, TG_ID);
        let dmr_id: i64 = id
            .parse()
            .map_err(|_| format!("talkgroup '{name}' has invalid ID '{id}'"))?;
        Ok(Some(Contact::new(
            dmr_id,
            name,
            CallType::from_str(index.text(row, TG_TYPE)),
        )))
    })
}

#[must_use]
pub fn encode_talkgroups(contacts: &[Contact]) -> RawTable {
    let mut table = RawTable::with_headers(TALKGROUP_HEADERS);
    for (i, c) in contacts.iter().filter(|c| !c.is_placeholder()).enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            c.name.clone(),
            c.dmr_id.to_string(),
            c.call_type.label().to_string(),
        ]);
    }
    table
}

// ── Zones / scan lists ───────────────────────────────────────

#[must_use]
pub fn decode_zones(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, ZONE_NAME, MEMBERS)
}

#[must_use]
pub fn encode_zones(zones: &[Grouping]) -> RawTable {
    encode_groupings(ZONE_HEADERS, zones)
}

#[must_use]
pub fn decode_scan_lists(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, SCAN_NAME, MEMBERS)
}

#[must_use]
pub fn encode_scan_lists(scan_lists: &[Grouping]) -> RawTable {
    encode_groupings(SCAN_LIST_HEADERS, scan_lists)
}

// ── Digital contacts ─────────────────────────────────────────

#[must_use]
pub fn decode_digital_contacts(table: &RawTable) -> Decoded<DirectoryContact> {
    decode_directory(table, &DIGITAL_CONTACT)
}

#[must_use]
pub fn encode_digital_contacts(entries: &[DirectoryContact]) -> RawTable {
    let mut table = RawTable::with_headers(DIGITAL_CONTACT_HEADERS);
    for (i, e) in entries.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            e.dmr_id.to_string(),
            e.callsign.clone(),
            e.name.clone(),
            e.city.clone(),
            e.state.clone(),
            e.country.clone(),
            e.remarks.clone(),
            CallType::Private.label().to_string(),
            "0".to_string(),
        ]);
    }
    table
}

// ── Roaming ──────────────────────────────────────────────────

#[must_use]
pub fn decode_roaming_channels(table: &RawTable) -> Decoded<RoamingChannel> {
    decode_roaming(table, &ROAM_CHANNEL)
}

#[must_use]
pub fn encode_roaming_channels(channels: &[RoamingChannel]) -> RawTable {
    let mut table = RawTable::with_headers(ROAM_CHANNEL_HEADERS);
    for (i, rc) in channels.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            rc.name.clone(),
            format!("{:.5}", rc.rx_frequency),
            format!("{:.5}", rc.tx_frequency),
            rc.color_code.to_string(),
            format!("Slot {}", rc.time_slot),
        ]);
    }
    table
}

#[must_use]
pub fn decode_roaming_zones(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, ZONE_NAME, MEMBERS)
}

#[must_use]
pub fn encode_roaming_zones(zones: &[Grouping]) -> RawTable {
    encode_groupings(ROAM_ZONE_HEADERS, zones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::parse_table;
    use crate::model::{ChannelType, Power, Protocol, SquelchType};

    #[test]
    fn test_decode_accepts_either_label() {
        let a = "Channel Name,Channel Type,RX Frequency[MHz],TX Frequency[MHz],Color Code,Time Slot\n\
                 Hotspot,Digital,438.80000,438.80000,1,Slot 2\n";
        let b = "Channel Name,Channel Type,Receive Frequency,Transmit Frequency,RX Color Code,Slot\n\
                 Hotspot,Digital,438.8,438.8,1,2\n";
        let first = decode_channels(&parse_table(a).unwrap());
        let second = decode_channels(&parse_table(b).unwrap());
        assert_eq!(first.items, second.items);
        assert_eq!(first.items[0].time_slot, 2);
        assert_eq!(first.items[0].channel_type, ChannelType::DigitalDmr);
    }

    #[test]
    fn test_options_round_trip() {
        let mut ch = Channel::new("Simplex", 446.0, 446.0);
        ch.options.squelch_level = Some(5);
        ch.options.forbid_tx = true;
        ch.options.lone_work = true;
        ch.options.aprs_report_type = Some("Digital".to_string());
        ch.power = Power::Mid;
        ch.squelch_type = SquelchType::Tone;
        ch.tx_tone = Some("67.0".to_string());

        let table = encode_channels(&[ch.clone()]);
        let row = &table.rows[0];
        assert_eq!(row[8], "Forbid TX");
        assert_eq!(row[10], "5");
        assert_eq!(row[12], "1");
        assert_eq!(row[32], "None");
        assert_eq!(row[33], "67.0");

        let back = &decode_channels(&table).items[0];
        assert_eq!(back.options, ch.options);
        assert_eq!(back.power, Power::Mid);
        assert_eq!(back.squelch_type, SquelchType::Tone);
        assert_eq!(back.tx_tone.as_deref(), Some("67.0"));
    }

    #[test]
    fn test_dmr_round_trip() {
        let mut ch = Channel::new("TG 3100", 442.0, 447.0);
        ch.channel_type = ChannelType::DigitalDmr;
        ch.protocol = Protocol::Dmr;
        ch.bandwidth = Bandwidth::Narrow;
        ch.color_code = 12;
        ch.time_slot = 1;
        ch.tx_contact = Some("USA".to_string());
        ch.rx_group = Some("North America".to_string());

        let back = &decode_channels(&encode_channels(&[ch.clone()])).items[0];
        assert_eq!(back.color_code, 12);
        assert_eq!(back.time_slot, 1);
        assert_eq!(back.tx_contact, ch.tx_contact);
        assert_eq!(back.rx_group, ch.rx_group);
        assert_eq!(back.bandwidth, Bandwidth::Narrow);
    }

    #[test]
    fn test_digital_contacts() {
        let csv = "No.,ID,Repeater,Name,City,Province,Country,Remark,Type,Alert Call\n\
                   1,3100001,K1AB,Ann Lee,Boston,MA,United States,,Private Call,0\n\
                   2,abc,K1XX,Bad,,,,,Private Call,0\n";
        let decoded = decode_digital_contacts(&parse_table(csv).unwrap());
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].state, "MA");
        assert_eq!(decoded.errors.len(), 1);
        let table = encode_digital_contacts(&decoded.items);
        assert_eq!(table.rows[0][9], "0");
    }

    #[test]
    fn test_zone_members() {
        let csv = "No.,Zone Name,Channel Members\n1,Home,A|B| C\n2,,X\n";
        let decoded = decode_zones(&parse_table(csv).unwrap());
        assert_eq!(decoded.items[0].members, vec!["A", "B", "C"]);
        assert_eq!(decoded.errors.len(), 1);
    }

    #[test]
    fn test_roaming_bad_color_code_keeps_row() {
        let csv = "No.,Channel Name,RX Frequency,TX Frequency,Color Code,Time Slot\n\
                   1,Bancroft,443.3125,448.3125,xx,1\n\
                   2,Hilltop,442.1,447.1,0,2\n";
        let decoded = decode_roaming_channels(&parse_table(csv).unwrap());
        assert!(decoded.errors.is_empty());
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.items[0].name, "Bancroft");
        assert_eq!(decoded.items[0].color_code, 1);
        assert_eq!(decoded.items[1].color_code, 1);
        assert_eq!(decoded.items[1].time_slot, 2);
    }
}
