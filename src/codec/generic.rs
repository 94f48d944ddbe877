//! Generic / DB25-D layout.
//!
//! Decoding is deliberately loose: it also accepts RepeaterBook-style and
//! CHIRP-style columns so a hand-made spreadsheet usually imports. Encoding
//! writes the DB25-D column set.

use crate::model::{CallType, Channel, Contact, Protocol};
use crate::normalize::{
    classify_mode, dcs_label, map_power, parse_bandwidth, parse_color_code, parse_frequency,
    parse_time_slot, resolve_duplex, split_tone_code, SquelchCandidates,
};

use super::chirp;
use super::table::{Aliases, Decoded, HeaderIndex, RawTable};
use super::{finish_channel, reference};

const NAME: Aliases = &["CH Name", "Name", "Callsign", "Channel Name"];
const RX_FREQ: Aliases = &["RX Freq", "Frequency", "RX Frequency", "Receive Frequency"];
const TX_FREQ: Aliases = &["TX Freq", "Input Freq", "TX Frequency", "Transmit Frequency"];
const DUPLEX: Aliases = &["Duplex"];
const OFFSET: Aliases = &["Offset"];
const MODE: Aliases = &["CH mode", "Mode"];
const BANDWIDTH: Aliases = &["Bandwidth", "Band Width"];
const POWER: Aliases = &["Power", "Transmit Power"];
const COLOR_CODE: Aliases = &["RX CC", "TX CC", "Color Code", "CC"];
const TIME_SLOT: Aliases = &["RX TS", "TX TS", "Time Slot", "Slot", "TS"];
const RX_GROUP: Aliases = &["RX Group", "RX Group List"];
const CONTACT: Aliases = &["Contacts", "Contact", "TX Contact", "Talkgroup"];
const RX_QT: Aliases = &["RX QT/DQT"];
const TX_QT: Aliases = &["TX QT/DQT"];
const SCAN_LIST: Aliases = &["Scan List"];
const NOTES: Aliases = &["Notes", "Comment"];

const TG_NAME: Aliases = &["Name", "Talkgroup", "Contact Name"];
const TG_ID: Aliases = &["ID", "DMRID", "DMR ID", "Radio ID", "TG ID"];
const TG_TYPE: Aliases = &["Type", "Call Type"];

pub const CHANNEL_HEADERS: &[&str] = &[
    "Z-4",
    "CH mode",
    "CH Name",
    "RX Freq",
    "TX Freq",
    "Power",
    "RX Only",
    "Alarm ACK",
    "Prompt",
    "PCT",
    "RX TS",
    "TX TS",
    "RX CC",
    "TX CC",
    "Msg Type",
    "TX Policy",
    "RX Group",
    "Encryption List",
    "Scan List",
    "Contacts",
    "EAS",
    "Relay Monitor",
    "Relay mode",
    "Bandwidth",
    "RX QT/DQT",
    "TX QT/DQT",
    "APRS",
];

pub const TALKGROUP_HEADERS: &[&str] = &["Name", "ID", "Type"];

/// Whether a header looks like this layout.
#[must_use]
pub fn sniff_channels(index: &HeaderIndex) -> bool {
    index.has(NAME) && index.has(RX_FREQ) && (index.has(MODE) || index.has(TX_FREQ))
}

/// Decode channels.
#[must_use]
pub fn decode_channels(table: &RawTable) -> Decoded<Channel> {
    let has_chirp_tone = table.index().has(chirp::TONE_MODE);
    Decoded::collect(table, |index, row| decode_channel(index, row, has_chirp_tone))
}

fn decode_channel(
    index: &HeaderIndex,
    row: &[String],
    has_chirp_tone: bool,
) -> std::result::Result<Option<Channel>, String> {
    let name = index.get(row, NAME).ok_or("missing channel name")?;
    let rx = index
        .get(row, RX_FREQ)
        .and_then(parse_frequency)
        .ok_or_else(|| format!("channel '{name}' has no usable receive frequency"))?;

    let tx = match index.get(row, TX_FREQ).and_then(parse_frequency) {
        Some(tx) => tx,
        None => {
            let offset = index.get(row, OFFSET).and_then(|o| o.parse::<f64>().ok());
            resolve_duplex(rx, index.text(row, DUPLEX), offset)
        }
    };

    let mode = classify_mode(index.text(row, MODE));
    let mut channel = Channel {
        channel_type: mode.channel_type,
        protocol: mode.protocol,
        bandwidth: index
            .get(row, BANDWIDTH)
            .and_then(parse_bandwidth)
            .unwrap_or(mode.bandwidth),
        power: map_power(index.text(row, POWER)),
        scan_list: reference(index.get(row, SCAN_LIST)),
        notes: index.owned(row, NOTES),
        ..Channel::new(name, rx, tx)
    };

    if channel.protocol == Protocol::Dmr {
        channel.color_code = match index.get(row, COLOR_CODE) {
            Some(raw) => parse_color_code(raw).unwrap_or(0),
            None => 1,
        };
        channel.time_slot = index.get(row, TIME_SLOT).and_then(parse_time_slot).unwrap_or(1);
        channel.rx_group = reference(index.get(row, RX_GROUP));
        channel.tx_contact = reference(index.get(row, CONTACT));
    }

    if has_chirp_tone {
        chirp::decode_squelch(index, row).apply(&mut channel);
    } else {
        let mut candidates = SquelchCandidates::default();
        candidates.set_rx(index.get(row, RX_QT).and_then(split_tone_code));
        candidates.set_tx(index.get(row, TX_QT).and_then(split_tone_code));
        candidates.reconcile().apply(&mut channel);
    }

    finish_channel(channel)
}

fn rx_code(channel: &Channel) -> String {
    channel
        .rx_tone
        .clone()
        .or_else(|| channel.rx_dcs.as_deref().map(dcs_label))
        .unwrap_or_else(|| "Off".to_string())
}

fn tx_code(channel: &Channel) -> String {
    channel
        .tx_tone
        .clone()
        .or_else(|| channel.tx_dcs.as_deref().map(dcs_label))
        .unwrap_or_else(|| "Off".to_string())
}

/// Encode channels in DB25-D layout.
#[must_use]
pub fn encode_channels(channels: &[Channel]) -> RawTable {
    let mut table = RawTable::with_headers(CHANNEL_HEADERS);
    for (i, ch) in channels.iter().enumerate() {
        let dmr = ch.is_dmr();
        let slot = format!("Slot {}", if dmr { ch.time_slot } else { 1 });
        let cc = if dmr { ch.color_code } else { 1 }.to_string();
        let off = || "Off".to_string();
        table.push_row(vec![
            (i + 1).to_string(),
            if dmr { "Digital" } else { "Analog" }.to_string(),
            ch.name.clone(),
            format!("{:.5}", ch.rx_frequency),
            format!("{:.5}", ch.tx_frequency),
            ch.power.as_str().to_string(),
            off(),
            off(),
            off(),
            "Patcs".to_string(),
            slot.clone(),
            slot,
            cc.clone(),
            cc,
            "Unconfirmed Data".to_string(),
            "Polite to CC".to_string(),
            dmr.then(|| ch.rx_group.clone())
                .flatten()
                .unwrap_or_else(|| "None".to_string()),
            off(),
            ch.scan_list.clone().unwrap_or_else(off),
            dmr.then(|| ch.tx_contact.clone())
                .flatten()
                .unwrap_or_else(|| "None".to_string()),
            off(),
            off(),
            off(),
            ch.bandwidth.as_str().to_string(),
            rx_code(ch),
            tx_code(ch),
            off(),
        ]);
    }
    table
}

/// Decode a Name/ID/Type talkgroup list. Rows without a name or numeric ID
/// are rejected.
#[must_use]
pub fn decode_talkgroups(table: &RawTable) -> Decoded<Contact> {
    Decoded::collect(table, |index, row| {
        let name = index.get(row, TG_NAME).ok_or("missing talkgroup name")?;
        let id = index
            .get(row, TG_ID)
            .ok_or_else(|| format!("talkgroup '{name}' has no ID"))?;
        let dmr_id: i64 = id
            .parse()
            .map_err(|_| format!("talkgroup '{name}' has invalid ID '{id}'"))?;
        let call_type = match index.text(row, TG_TYPE) {
            "Private" | "Private Call" => CallType::Private,
            "All" | "All Call" => CallType::AllCall,
            _ => CallType::Group,
        };
        Ok(Some(Contact::new(dmr_id, name, call_type)))
    })
}

#[must_use]
pub fn encode_talkgroups(contacts: &[Contact]) -> RawTable {
    let mut table = RawTable::with_headers(TALKGROUP_HEADERS);
    for contact in contacts.iter().filter(|c| !c.is_placeholder()) {
        let kind = match contact.call_type {
            CallType::Group => "Group",
            CallType::Private => "Private",
            CallType::AllCall => "All",
        };
        table.push_row(vec![
            contact.name.clone(),
            contact.dmr_id.to_string(),
            kind.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::parse_table;
    use crate::model::{Bandwidth, ChannelType, Power, SquelchType};

    #[test]
    fn test_decode_db25d_dmr_row() {
        let csv = "Z-4,CH mode,CH Name,RX Freq,TX Freq,Power,RX TS,RX CC,RX Group,Contacts,Bandwidth,RX QT/DQT,TX QT/DQT\n\
                   1,Digital,Local,439.50000,431.90000,Low,Slot 2,3,None,Local 9,12.5,Off,Off\n";
        let decoded = decode_channels(&parse_table(csv).unwrap());
        assert!(decoded.errors.is_empty());
        let ch = &decoded.items[0];
        assert_eq!(ch.channel_type, ChannelType::DigitalDmr);
        assert_eq!(ch.color_code, 3);
        assert_eq!(ch.time_slot, 2);
        assert_eq!(ch.tx_contact.as_deref(), Some("Local 9"));
        assert_eq!(ch.rx_group, None);
        assert_eq!(ch.power, Power::Low);
        assert_eq!(ch.squelch_type, SquelchType::None);
    }

    #[test]
    fn test_decode_repeaterbook_duplex() {
        let csv = "Callsign,Frequency,Duplex,Offset,Mode\nW1AW,146.52,+,0.6,FM\n";
        let decoded = decode_channels(&parse_table(csv).unwrap());
        let ch = &decoded.items[0];
        assert!((ch.tx_frequency - 147.12).abs() < 1e-9);
        assert_eq!(ch.bandwidth, Bandwidth::Wide);
    }

    #[test]
    fn test_tx_qt_dcs() {
        let csv = "CH Name,RX Freq,TX Freq,CH mode,TX QT/DQT\nRpt,145.31,144.71,Analog,D023N\n";
        let ch = &decode_channels(&parse_table(csv).unwrap()).items[0];
        assert_eq!(ch.squelch_type, SquelchType::Dcs);
        assert_eq!(ch.tx_dcs.as_deref(), Some("023"));
        assert_eq!(ch.rx_dcs.as_deref(), Some("023"));
    }

    #[test]
    fn test_dmr_color_code_zero_is_rejected() {
        let csv = "CH Name,RX Freq,CH mode,RX CC\nBad,439.5,Digital,0\nGood,439.5,Digital,\n";
        let decoded = decode_channels(&parse_table(csv).unwrap());
        assert_eq!(decoded.errors.len(), 1);
        assert_eq!(decoded.errors[0].row, 1);
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].color_code, 1);
    }

    #[test]
    fn test_missing_name_and_frequency_are_row_errors() {
        let csv = "CH Name,RX Freq\n,146.52\nNoFreq,abc\nOk,146.52\n";
        let decoded = decode_channels(&parse_table(csv).unwrap());
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.errors.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_squelch_and_dmr() {
        let mut tsql = Channel::new("Split", 146.94, 146.34);
        tsql.squelch_type = SquelchType::Tsql;
        tsql.rx_tone = Some("100.0".to_string());
        tsql.tx_tone = Some("88.5".to_string());
        tsql.power = Power::Mid;

        let mut dmr = Channel::new("TG 91", 439.5, 431.9);
        dmr.channel_type = ChannelType::DigitalDmr;
        dmr.protocol = Protocol::Dmr;
        dmr.bandwidth = Bandwidth::Narrow;
        dmr.color_code = 7;
        dmr.time_slot = 2;
        dmr.tx_contact = Some("Worldwide".to_string());

        let encoded = encode_channels(&[tsql.clone(), dmr.clone()]);
        let decoded = decode_channels(&encoded);
        assert!(decoded.errors.is_empty());
        let [a, b] = decoded.items.as_slice() else {
            panic!("expected two channels");
        };
        assert_eq!(a.squelch_type, SquelchType::Tsql);
        assert_eq!(a.rx_tone, tsql.rx_tone);
        assert_eq!(a.tx_tone, tsql.tx_tone);
        assert_eq!(a.power, Power::Mid);
        assert_eq!(a.bandwidth, Bandwidth::Wide);
        assert_eq!((b.color_code, b.time_slot), (7, 2));
        assert_eq!(b.tx_contact, dmr.tx_contact);
        assert_eq!(b.bandwidth, Bandwidth::Narrow);
    }

    #[test]
    fn test_talkgroups() {
        let csv = "Name,ID,Type\nWorldwide,91,Group\nOps,3100123,Private Call\nAll,16777215,All\nNoId,,Group\n";
        let decoded = decode_talkgroups(&parse_table(csv).unwrap());
        assert_eq!(decoded.items.len(), 3);
        assert_eq!(decoded.items[1].call_type, CallType::Private);
        assert_eq!(decoded.items[2].call_type, CallType::AllCall);
        assert_eq!(decoded.errors.len(), 1);

        let table = encode_talkgroups(&decoded.items);
        assert_eq!(table.rows[2][2], "All");
    }
}
