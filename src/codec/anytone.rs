//! AnyTone 890 CPS layout.
//!
//! The CPS insists on every field being quoted and CRLF line endings, so
//! every table here is written with `TableStyle::QuotedCrlf`. Membership
//! columns hold `|`-joined channel names.

use std::collections::HashMap;

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
    finish_channel, join_members, reference, DirectoryColumns, RoamingColumns,
};

const NAME: Aliases = &["Channel Name"];
const RX_FREQ: Aliases = &["Receive Frequency"];
const TX_FREQ: Aliases = &["Transmit Frequency"];
const CHANNEL_TYPE: Aliases = &["Channel Type"];
const POWER: Aliases = &["Transmit Power"];
const BANDWIDTH: Aliases = &["Band Width"];
const DECODE: Aliases = &["CTCSS/DCS Decode"];
const ENCODE: Aliases = &["CTCSS/DCS Encode"];
const CONTACT: Aliases = &["Contact/Talk Group"];
const BUSY_LOCK: Aliases = &["Busy Lock/TX Permit"];
const OPTIONAL_SIGNAL: Aliases = &["Optional Signal"];
const DTMF_ID: Aliases = &["DTMF ID"];
const TONE2_ID: Aliases = &["2Tone ID"];
const TONE5_ID: Aliases = &["5Tone ID"];
const PTT_ID: Aliases = &["PTT ID"];
const COLOR_CODE: Aliases = &["RX Color Code"];
const SLOT: Aliases = &["Slot"];
const SCAN_LIST: Aliases = &["Scan List"];
const RX_GROUP: Aliases = &["Receive Group List"];
const TALK_AROUND: Aliases = &["Talk Around(Simplex)"];
const WORK_ALONE: Aliases = &["Work Alone"];
const AUTO_SCAN: Aliases = &["Auto Scan"];

const TG_ID: Aliases = &["Radio ID"];
const TG_NAME: Aliases = &["Name"];
const TG_TYPE: Aliases = &["Call Type"];

const ZONE_NAME: Aliases = &["Zone Name"];
const ZONE_MEMBERS: Aliases = &["Zone Channel Member"];
const SCAN_NAME: Aliases = &["Scan List Name"];
const SCAN_MEMBERS: Aliases = &["Scan Channel Member"];
const ROAM_ZONE_NAME: Aliases = &["Name"];
const ROAM_ZONE_MEMBERS: Aliases = &["Roaming Channel Member"];

const ROAM_CHANNEL: RoamingColumns = RoamingColumns {
    name: &["Name"],
    rx: &["Receive Frequency"],
    tx: &["Transmit Frequency"],
    color_code: &["Color Code"],
    time_slot: &["Slot"],
};

const DIGITAL_CONTACT: DirectoryColumns = DirectoryColumns {
    dmr_id: &["Radio ID"],
    callsign: &["Callsign"],
    name: &["Name"],
    city: &["City"],
    state: &["State"],
    country: &["Country"],
    remarks: &["Remarks"],
};

pub const CHANNEL_HEADERS: &[&str] = &[
    "No.",
    "Channel Name",
    "Receive Frequency",
    "Transmit Frequency",
    "Channel Type",
    "Transmit Power",
    "Band Width",
    "CTCSS/DCS Decode",
    "CTCSS/DCS Encode",
    "Contact/Talk Group",
    "Contact/Talk Group Call Type",
    "Contact/Talk Group TG/DMR ID",
    "Radio ID",
    "Busy Lock/TX Permit",
    "Squelch Mode",
    "Optional Signal",
    "DTMF ID",
    "2Tone ID",
    "5Tone ID",
    "PTT ID",
    "RX Color Code",
    "Slot",
    "Scan List",
    "Receive Group List",
    "PTT Prohibit",
    "Reverse",
    "Digital Duplex",
    "Slot Suit",
    "AES Digital Encryption",
    "Digital Encryption",
    "Call Confirmation",
    "Talk Around(Simplex)",
    "Work Alone",
    "Custom CTCSS",
    "2TONE Decode",
    "Ranging",
    "Idle TX",
    "APRS RX",
    "Analog APRS PTT Mode",
    "Digital APRS PTT Mode",
    "APRS Report Type",
    "Digital APRS Report Channel",
    "Correct Frequency[Hz]",
    "SMS Confirmation",
    "Exclude channel from roaming",
    "DMR MODE",
    "DataACK Disable",
    "R5toneBot",
    "R5ToneEot",
    "Auto Scan",
    "Ana APRS Mute",
    "Send Talker Alias DMR/NX",
    "AnaAprsTxPath",
    "ARC4",
    "ex_emg_kind",
    "Rpga_Mdc",
    "DisturEn",
    "DisturFreq",
    "dmr_crc_ignore",
    "compand",
    "tx_talkalaes",
    "dup_call",
    "tx_int",
    "BtRxState",
    "idle_tx",
    "nxdn_wn",
    "NxdnRpga",
    "nxdnSqCon",
    "NxdnTxBusy",
    "NxDnPttId",
    "EnRan",
    "DeRan",
    "NxdnEncry",
    "NxdnGroupId",
    "NxdnIdNum",
    "NxdnStateNum",
    "txcc",
];

pub const TALKGROUP_HEADERS: &[&str] = &["No.", "Radio ID", "Name", "Call Type", "Call Alert"];

pub const ZONE_HEADERS: &[&str] = &[
    "No.",
    "Zone Name",
    "Zone Channel Member",
    "Zone Channel Member RX Frequency",
    "Zone Channel Member TX Frequency",
    "A Channel",
    "A Channel RX Frequency",
    "A Channel TX Frequency",
    "B Channel",
    "B Channel RX Frequency",
    "B Channel TX Frequency",
    "Zone Hide ",
];

pub const SCAN_LIST_HEADERS: &[&str] = &["No.", "Scan List Name", "Scan Channel Member"];

pub const DIGITAL_CONTACT_HEADERS: &[&str] = &[
    "No.",
    "Radio ID",
    "Callsign",
    "Name",
    "City",
    "State",
    "Country",
    "Remarks",
    "Call Type",
    "Call Alert",
];

pub const ROAM_CHANNEL_HEADERS: &[&str] = &[
    "No.",
    "Receive Frequency",
    "Transmit Frequency",
    "Color Code",
    "Slot",
    "Name",
];

pub const ROAM_ZONE_HEADERS: &[&str] = &["No.", "Name", "Roaming Channel Member"];

/// Columns past "Custom CTCSS" whose CPS default is "Off" rather than "0".
const OFF_TAIL_COLUMNS: &[&str] = &[
    "Ranging",
    "Idle TX",
    "APRS RX",
    "Analog APRS PTT Mode",
    "Digital APRS PTT Mode",
    "APRS Report Type",
    "SMS Confirmation",
];

/// Columns past "Custom CTCSS" whose CPS default is "1".
const ONE_TAIL_COLUMNS: &[&str] = &["Digital APRS Report Channel", "txcc"];

/// Whether a header looks like an AnyTone channel export.
#[must_use]
pub fn sniff_channels(index: &HeaderIndex) -> bool {
    index.has(NAME) && index.has(RX_FREQ) && index.has(CHANNEL_TYPE) && index.has(BUSY_LOCK)
}

// ── Channels ─────────────────────────────────────────────────

/// Decode `Channel.CSV`.
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
            busy_lock: reference(index.get(row, BUSY_LOCK)),
            optional_signal: reference(index.get(row, OPTIONAL_SIGNAL)),
            dtmf_id: index.owned(row, DTMF_ID),
            tone2_id: index.owned(row, TONE2_ID),
            tone5_id: index.owned(row, TONE5_ID),
            ptt_id: reference(index.get(row, PTT_ID)),
            talk_around: parse_flag(index.text(row, TALK_AROUND)),
            work_alone: parse_flag(index.text(row, WORK_ALONE)),
            auto_scan: parse_flag(index.text(row, AUTO_SCAN)),
            ..ChannelOptions::default()
        },
        ..Channel::new(name, rx, tx)
    };

    if channel.is_dmr() {
        channel.color_code = match index.get(row, COLOR_CODE) {
            Some(raw) => parse_color_code(raw).unwrap_or(0),
            None => 1,
        };
        channel.time_slot = index.get(row, SLOT).and_then(parse_time_slot).unwrap_or(1);
        channel.tx_contact = reference(index.get(row, CONTACT));
        channel.rx_group = reference(index.get(row, RX_GROUP));
    }

    let mut candidates = SquelchCandidates::default();
    candidates.set_rx(index.get(row, DECODE).and_then(split_tone_code));
    candidates.set_tx(index.get(row, ENCODE).and_then(split_tone_code));
    candidates.reconcile().apply(&mut channel);

    finish_channel(channel)
}

fn on_off(flag: bool) -> String {
    if flag { "On" } else { "Off" }.to_string()
}

fn tone_or_off(tone: Option<&String>, dcs: Option<&String>) -> String {
    tone.cloned()
        .or_else(|| dcs.map(|d| dcs_label(d)))
        .unwrap_or_else(|| "Off".to_string())
}

/// Encode `Channel.CSV`. Contacts supply the call type and ID columns.
#[must_use]
pub fn encode_channels(channels: &[Channel], contacts: &[Contact]) -> RawTable {
    let by_name: HashMap<String, &Contact> = contacts
        .iter()
        .map(|c| (c.name.trim().to_uppercase(), c))
        .collect();

    let mut table = RawTable::with_headers(CHANNEL_HEADERS);
    for (i, ch) in channels.iter().enumerate() {
        let mut row = vec![String::new(); CHANNEL_HEADERS.len()];
        let digital = ch.is_dmr();
        let contact = ch
            .tx_contact
            .as_ref()
            .and_then(|name| by_name.get(&name.trim().to_uppercase()));

        row[0] = (i + 1).to_string();
        row[1] = ch.name.clone();
        row[2] = format!("{:.5}", ch.rx_frequency);
        row[3] = format!("{:.5}", ch.tx_frequency);
        row[4] = if digital { "D-Digital" } else { "A-Analog" }.to_string();
        row[5] = ch.power.as_str().to_string();
        row[6] = match ch.bandwidth {
            Bandwidth::Narrow => "12.5K",
            Bandwidth::Wide => "25K",
        }
        .to_string();
        row[7] = tone_or_off(ch.rx_tone.as_ref(), ch.rx_dcs.as_ref());
        row[8] = tone_or_off(ch.tx_tone.as_ref(), ch.tx_dcs.as_ref());
        row[9] = ch.tx_contact.clone().unwrap_or_else(|| "None".to_string());
        row[10] = contact.map_or(CallType::Group, |c| c.call_type).label().to_string();
        row[11] = contact.map_or_else(|| "1".to_string(), |c| c.dmr_id.to_string());
        row[12] = if digital { "1" } else { "" }.to_string();
        row[13] = ch.options.busy_lock.clone().unwrap_or_else(|| "Off".to_string());
        row[14] = "Carrier".to_string();
        row[15] = ch
            .options
            .optional_signal
            .clone()
            .unwrap_or_else(|| "Off".to_string());
        row[16] = ch.options.dtmf_id.clone().unwrap_or_else(|| "1".to_string());
        row[17] = ch.options.tone2_id.clone().unwrap_or_else(|| "1".to_string());
        row[18] = ch.options.tone5_id.clone().unwrap_or_else(|| "1".to_string());
        row[19] = ch.options.ptt_id.clone().unwrap_or_else(|| "Off".to_string());
        row[20] = ch.color_code.to_string();
        row[21] = ch.time_slot.max(1).to_string();
        row[22] = ch.scan_list.clone().unwrap_or_else(|| "None".to_string());
        row[23] = ch.rx_group.clone().unwrap_or_else(|| "None".to_string());
        for cell in &mut row[24..=27] {
            *cell = "Off".to_string();
        }
        row[28] = "Normal Encryption".to_string();
        row[29] = "Off".to_string();
        row[30] = "Off".to_string();
        row[31] = on_off(ch.options.talk_around);
        row[32] = on_off(ch.options.work_alone);
        row[33] = "251.1".to_string();
        for (j, header) in CHANNEL_HEADERS.iter().enumerate().skip(34) {
            row[j] = if OFF_TAIL_COLUMNS.contains(header) {
                "Off"
            } else if ONE_TAIL_COLUMNS.contains(header) {
                "1"
            } else {
                "0"
            }
            .to_string();
        }
        if ch.options.auto_scan {
            if let Some(j) = CHANNEL_HEADERS.iter().position(|h| *h == "Auto Scan") {
                row[j] = "1".to_string();
            }
        }
        table.push_row(row);
    }
    table
}

// ── Talkgroups ───────────────────────────────────────────────

/// Decode `DMRTalkGroups.CSV`.
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
            c.dmr_id.to_string(),
            c.name.clone(),
            c.call_type.label().to_string(),
            "None".to_string(),
        ]);
    }
    table
}

// ── Zones / scan lists ───────────────────────────────────────

#[must_use]
pub fn decode_zones(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, ZONE_NAME, ZONE_MEMBERS)
}

/// Encode `DMRZone.CSV`. Member frequencies come from `channels`.
#[must_use]
pub fn encode_zones(zones: &[Grouping], channels: &[Channel]) -> RawTable {
    let by_name: HashMap<&str, &Channel> = channels.iter().map(|c| (c.name.as_str(), c)).collect();
    let freq = |name: &String, tx: bool| {
        by_name.get(name.as_str()).map_or_else(String::new, |c| {
            format!("{:.5}", if tx { c.tx_frequency } else { c.rx_frequency })
        })
    };

    let mut table = RawTable::with_headers(ZONE_HEADERS);
    for (i, zone) in zones.iter().enumerate() {
        let rx: Vec<String> = zone.members.iter().map(|m| freq(m, false)).collect();
        let tx: Vec<String> = zone.members.iter().map(|m| freq(m, true)).collect();
        let a = zone.members.first();
        let b = zone.members.get(1).or(a);
        let slot = |m: Option<&String>| match m {
            Some(name) => [name.clone(), freq(name, false), freq(name, true)],
            None => [String::new(), String::new(), String::new()],
        };
        let [a_name, a_rx, a_tx] = slot(a);
        let [b_name, b_rx, b_tx] = slot(b);
        table.push_row(vec![
            (i + 1).to_string(),
            zone.name.clone(),
            join_members(&zone.members),
            rx.join("|"),
            tx.join("|"),
            a_name,
            a_rx,
            a_tx,
            b_name,
            b_rx,
            b_tx,
            "0".to_string(),
        ]);
    }
    table
}

#[must_use]
pub fn decode_scan_lists(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, SCAN_NAME, SCAN_MEMBERS)
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
            "None".to_string(),
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
            format!("{:.5}", rc.rx_frequency),
            format!("{:.5}", rc.tx_frequency),
            rc.color_code.to_string(),
            format!("Slot{}", rc.time_slot),
            rc.name.clone(),
        ]);
    }
    table
}

#[must_use]
pub fn decode_roaming_zones(table: &RawTable) -> Decoded<Grouping> {
    decode_groupings(table, ROAM_ZONE_NAME, ROAM_ZONE_MEMBERS)
}

#[must_use]
pub fn encode_roaming_zones(zones: &[Grouping]) -> RawTable {
    encode_groupings(ROAM_ZONE_HEADERS, zones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::{parse_table, render_table, TableStyle};
    use crate::model::{Power, Protocol, SquelchType};

    fn dmr_channel() -> Channel {
        let mut ch = Channel::new("Local 9", 439.5, 431.9);
        ch.channel_type = crate::model::ChannelType::DigitalDmr;
        ch.protocol = Protocol::Dmr;
        ch.bandwidth = Bandwidth::Narrow;
        ch.color_code = 3;
        ch.time_slot = 2;
        ch.tx_contact = Some("Local".to_string());
        ch
    }

    #[test]
    fn test_channel_defaults() {
        let contacts = [Contact::new(9, "Local", CallType::Group)];
        let table = encode_channels(&[dmr_channel()], &contacts);
        assert_eq!(table.headers.len(), 77);
        let row = &table.rows[0];
        assert_eq!(row[4], "D-Digital");
        assert_eq!(row[6], "12.5K");
        assert_eq!(row[7], "Off");
        assert_eq!(row[10], "Group Call");
        assert_eq!(row[11], "9");
        assert_eq!(row[12], "1");
        assert_eq!(row[14], "Carrier");
        assert_eq!(row[21], "2");
        assert_eq!(row[22], "None");
        assert_eq!(row[28], "Normal Encryption");
        assert_eq!(row[33], "251.1");
        assert_eq!(row[34], "0");
        assert_eq!(row[35], "Off");
        assert_eq!(row[41], "1");
        assert_eq!(row[76], "1");
    }

    #[test]
    fn test_unknown_contact_uses_defaults() {
        let table = encode_channels(&[dmr_channel()], &[]);
        assert_eq!(table.rows[0][10], "Group Call");
        assert_eq!(table.rows[0][11], "1");
    }

    #[test]
    fn test_channel_round_trip() {
        let mut analog = Channel::new("Rpt", 147.12, 147.72);
        analog.squelch_type = SquelchType::Dcs;
        analog.rx_dcs = Some("023".to_string());
        analog.tx_dcs = Some("023".to_string());
        analog.power = Power::Low;
        analog.options.talk_around = true;

        let text = render_table(&encode_channels(&[analog.clone(), dmr_channel()], &[]), TableStyle::QuotedCrlf)
            .unwrap();
        assert!(text.starts_with("\"No.\",\"Channel Name\""));
        assert!(text.contains("\r\n"));

        let decoded = decode_channels(&parse_table(&text).unwrap());
        assert!(decoded.errors.is_empty(), "{:?}", decoded.errors);
        let a = &decoded.items[0];
        assert_eq!(a.squelch_type, SquelchType::Dcs);
        assert_eq!(a.rx_dcs.as_deref(), Some("023"));
        assert_eq!(a.power, Power::Low);
        assert_eq!(a.bandwidth, Bandwidth::Wide);
        assert!(a.options.talk_around);
        let d = &decoded.items[1];
        assert!(d.is_dmr());
        assert_eq!((d.color_code, d.time_slot), (3, 2));
        assert_eq!(d.tx_contact.as_deref(), Some("Local"));
    }

    #[test]
    fn test_zone_a_b_channels() {
        let channels = [
            Channel::new("One", 146.52, 146.52),
            Channel::new("Two", 147.12, 147.72),
        ];
        let zones = [
            Grouping::new("Single", vec!["One".to_string()]),
            Grouping::new("Pair", vec!["One".to_string(), "Two".to_string()]),
        ];
        let table = encode_zones(&zones, &channels);
        let single = &table.rows[0];
        assert_eq!(single[5], "One");
        assert_eq!(single[8], "One");
        let pair = &table.rows[1];
        assert_eq!(pair[2], "One|Two");
        assert_eq!(pair[3], "146.52000|147.12000");
        assert_eq!(pair[4], "146.52000|147.72000");
        assert_eq!(pair[8], "Two");
        assert_eq!(pair[11], "0");

        let decoded = decode_zones(&table);
        assert_eq!(decoded.items[1].members, vec!["One", "Two"]);
    }

    #[test]
    fn test_talkgroups_and_roaming() {
        let csv = "\"No.\",\"Radio ID\",\"Name\",\"Call Type\",\"Call Alert\"\r\n\
                   \"1\",\"91\",\"Worldwide\",\"Group Call\",\"None\"\r\n\
                   \"2\",\"3100\",\"Ops\",\"Private Call\",\"None\"\r\n";
        let decoded = decode_talkgroups(&parse_table(csv).unwrap());
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.items[1].call_type, CallType::Private);

        let roam = [RoamingChannel::new("Rpt A", 440.0, 445.0)];
        let table = encode_roaming_channels(&roam);
        assert_eq!(table.rows[0][4], "Slot1");
        let back = decode_roaming_channels(&table);
        assert_eq!(back.items[0].name, "Rpt A");
        assert_eq!(back.items[0].time_slot, 1);
        assert!((back.items[0].tx_frequency - 445.0).abs() < 1e-9);
    }

    #[test]
    fn test_roaming_bad_color_code_keeps_row() {
        let csv = "\"No.\",\"Receive Frequency\",\"Transmit Frequency\",\"Color Code\",\"Slot\",\"Name\"\r\n\
                   \"1\",\"443.3125\",\"448.3125\",\"99\",\"Slot2\",\"Bancroft\"\r\n";
        let decoded = decode_roaming_channels(&parse_table(csv).unwrap());
        assert!(decoded.errors.is_empty());
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].color_code, 1);
        assert_eq!(decoded.items[0].time_slot, 2);
    }
}
