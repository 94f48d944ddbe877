//! CHIRP memory layout.
//!
//! CHIRP has no grouping concept and no DMR support: encoding drops DMR and
//! NXDN channels, and only the channel member exists.

use crate::model::{Bandwidth, Channel, Protocol, SquelchType};
use crate::normalize::{
    classify_mode, cross_candidates, map_power, normalize_ctcss, normalize_dcs, parse_frequency,
    resolve_duplex, Squelch, SquelchCandidates,
};

use super::table::{Aliases, Decoded, HeaderIndex, RawTable};
use super::finish_channel;

const LOCATION: Aliases = &["Location"];
const NAME: Aliases = &["Name"];
const FREQUENCY: Aliases = &["Frequency"];
const DUPLEX: Aliases = &["Duplex"];
const OFFSET: Aliases = &["Offset"];
pub(crate) const TONE_MODE: Aliases = &["Tone"];
const R_TONE: Aliases = &["rToneFreq"];
const C_TONE: Aliases = &["cToneFreq"];
const DTCS: Aliases = &["DtcsCode"];
const RX_DTCS: Aliases = &["RxDtcsCode"];
const CROSS_MODE: Aliases = &["CrossMode"];
const MODE: Aliases = &["Mode"];
const POWER: Aliases = &["Power"];
const COMMENT: Aliases = &["Comment"];

pub const CHANNEL_HEADERS: &[&str] = &[
    "Location",
    "Name",
    "Frequency",
    "Duplex",
    "Offset",
    "Tone",
    "rToneFreq",
    "cToneFreq",
    "DtcsCode",
    "DtcsPolarity",
    "RxDtcsCode",
    "CrossMode",
    "Mode",
    "TStep",
    "Skip",
    "Power",
    "Comment",
    "URCALL",
    "RPT1CALL",
    "RPT2CALL",
    "DVCODE",
];

const DEFAULT_TONE: &str = "88.5";
const DEFAULT_DTCS: &str = "023";

/// Whether a header looks like a CHIRP export.
#[must_use]
pub fn sniff_channels(index: &HeaderIndex) -> bool {
    index.has(LOCATION) && index.has(FREQUENCY) && (index.has(DUPLEX) || index.has(TONE_MODE))
}

/// Read the Tone/rToneFreq/cToneFreq/Dtcs group of a row.
#[must_use]
pub fn decode_squelch(index: &HeaderIndex, row: &[String]) -> Squelch {
    let r_tone = || index.get(row, R_TONE).and_then(normalize_ctcss);
    let c_tone = || index.get(row, C_TONE).and_then(normalize_ctcss);
    let dtcs = || index.get(row, DTCS).and_then(normalize_dcs);

    let candidates = match index.text(row, TONE_MODE).to_lowercase().as_str() {
        "tone" => SquelchCandidates {
            tx_tone: r_tone(),
            ..SquelchCandidates::default()
        },
        "tsql" => SquelchCandidates {
            rx_tone: c_tone(),
            tx_tone: c_tone(),
            ..SquelchCandidates::default()
        },
        "dtcs" => SquelchCandidates {
            rx_dcs: dtcs(),
            tx_dcs: dtcs(),
            ..SquelchCandidates::default()
        },
        "cross" => cross_candidates(
            index.text(row, CROSS_MODE),
            r_tone(),
            c_tone(),
            dtcs(),
            index.get(row, RX_DTCS).and_then(normalize_dcs),
        ),
        _ => SquelchCandidates::default(),
    };
    candidates.reconcile()
}

/// Decode CHIRP channels.
#[must_use]
pub fn decode_channels(table: &RawTable) -> Decoded<Channel> {
    Decoded::collect(table, decode_channel)
}

fn decode_channel(index: &HeaderIndex, row: &[String]) -> std::result::Result<Option<Channel>, String> {
    let name = index.get(row, NAME).ok_or("missing channel name")?;
    let rx = index
        .get(row, FREQUENCY)
        .and_then(parse_frequency)
        .ok_or_else(|| format!("channel '{name}' has no usable frequency"))?;

    let duplex = index.text(row, DUPLEX);
    let offset = index.get(row, OFFSET).and_then(|o| o.parse::<f64>().ok());
    let tx = resolve_duplex(rx, duplex, offset);

    let mode = classify_mode(index.text(row, MODE));
    let mut channel = Channel {
        channel_type: mode.channel_type,
        protocol: mode.protocol,
        bandwidth: mode.bandwidth,
        power: map_power(index.text(row, POWER)),
        notes: index.owned(row, COMMENT),
        ..Channel::new(name, rx, tx)
    };
    channel.options.forbid_tx = duplex.eq_ignore_ascii_case("off");
    decode_squelch(index, row).apply(&mut channel);

    finish_channel(channel)
}

fn mode_token(channel: &Channel) -> &'static str {
    match channel.protocol {
        Protocol::Fm if channel.bandwidth == Bandwidth::Narrow => "NFM",
        Protocol::Am => "AM",
        Protocol::Fusion => "DN",
        Protocol::Dstar => "DV",
        Protocol::P25 => "P25",
        _ => "FM",
    }
}

/// Tone columns: (Tone, rToneFreq, cToneFreq, DtcsCode, RxDtcsCode, CrossMode).
fn tone_columns(ch: &Channel) -> [String; 6] {
    let or = |v: &Option<String>, d: &str| v.clone().unwrap_or_else(|| d.to_string());
    let mut cols = [
        String::new(),
        DEFAULT_TONE.to_string(),
        DEFAULT_TONE.to_string(),
        DEFAULT_DTCS.to_string(),
        DEFAULT_DTCS.to_string(),
        "Tone->Tone".to_string(),
    ];
    match ch.squelch_type {
        SquelchType::None => {}
        SquelchType::Tone => {
            cols[0] = "Tone".to_string();
            cols[1] = or(&ch.tx_tone, DEFAULT_TONE);
        }
        SquelchType::Tsql if ch.tx_tone.is_none() || ch.tx_tone == ch.rx_tone => {
            cols[0] = "TSQL".to_string();
            cols[2] = or(&ch.rx_tone, DEFAULT_TONE);
        }
        SquelchType::Tsql => {
            cols[0] = "Cross".to_string();
            cols[1] = or(&ch.tx_tone, DEFAULT_TONE);
            cols[2] = or(&ch.rx_tone, DEFAULT_TONE);
        }
        SquelchType::Dcs if ch.rx_dcs.is_none() || ch.rx_dcs == ch.tx_dcs => {
            cols[0] = "DTCS".to_string();
            cols[3] = or(&ch.tx_dcs, DEFAULT_DTCS);
            cols[4] = cols[3].clone();
        }
        SquelchType::Dcs => {
            cols[0] = "Cross".to_string();
            cols[3] = or(&ch.tx_dcs, DEFAULT_DTCS);
            cols[4] = or(&ch.rx_dcs, DEFAULT_DTCS);
            cols[5] = "DTCS->DTCS".to_string();
        }
        SquelchType::Cross => {
            let tx_side = if ch.tx_tone.is_some() {
                "Tone"
            } else if ch.tx_dcs.is_some() {
                "DTCS"
            } else {
                ""
            };
            let rx_side = if ch.rx_tone.is_some() {
                "Tone"
            } else if ch.rx_dcs.is_some() {
                "DTCS"
            } else {
                ""
            };
            cols[0] = "Cross".to_string();
            cols[1] = or(&ch.tx_tone, DEFAULT_TONE);
            cols[2] = or(&ch.rx_tone, DEFAULT_TONE);
            cols[3] = or(&ch.tx_dcs, DEFAULT_DTCS);
            cols[4] = or(&ch.rx_dcs, DEFAULT_DTCS);
            cols[5] = format!("{tx_side}->{rx_side}");
        }
    }
    cols
}

/// Encode channels, skipping those CHIRP cannot represent.
#[must_use]
pub fn encode_channels(channels: &[Channel]) -> RawTable {
    let mut table = RawTable::with_headers(CHANNEL_HEADERS);
    let supported = channels
        .iter()
        .filter(|c| !matches!(c.protocol, Protocol::Dmr | Protocol::Nxdn));
    for (i, ch) in supported.enumerate() {
        let diff = ch.offset();
        let (duplex, offset) = if ch.options.forbid_tx {
            ("off", 0.0)
        } else if diff > 1e-6 {
            ("+", diff)
        } else if diff < -1e-6 {
            ("-", -diff)
        } else {
            ("", 0.0)
        };
        let [tone, r_tone, c_tone, dtcs, rx_dtcs, cross] = tone_columns(ch);
        table.push_row(vec![
            (i + 1).to_string(),
            ch.name.clone(),
            format!("{:.6}", ch.rx_frequency),
            duplex.to_string(),
            format!("{offset:.6}"),
            tone,
            r_tone,
            c_tone,
            dtcs,
            "NN".to_string(),
            rx_dtcs,
            cross,
            mode_token(ch).to_string(),
            "5.00".to_string(),
            String::new(),
            ch.power.watts().to_string(),
            ch.notes.clone().unwrap_or_default(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::parse_table;
    use crate::model::{ChannelType, Power};

    const HEADER: &str =
        "Location,Name,Frequency,Duplex,Offset,Tone,rToneFreq,cToneFreq,DtcsCode,DtcsPolarity,RxDtcsCode,CrossMode,Mode,Power,Comment\n";

    fn decode(rows: &str) -> Decoded<Channel> {
        decode_channels(&parse_table(&format!("{HEADER}{rows}")).unwrap())
    }

    #[test]
    fn test_decode_repeater_with_tone() {
        let decoded = decode("1,W1AW,146.940000,-,0.600000,Tone,100.0,88.5,023,NN,023,Tone->Tone,FM,50W,club\n");
        let ch = &decoded.items[0];
        assert!((ch.tx_frequency - 146.34).abs() < 1e-9);
        assert_eq!(ch.squelch_type, SquelchType::Tone);
        assert_eq!(ch.tx_tone.as_deref(), Some("100.0"));
        assert_eq!(ch.rx_tone, None);
        assert_eq!(ch.notes.as_deref(), Some("club"));
    }

    #[test]
    fn test_decode_cross_tone_tone() {
        let decoded = decode("1,X,146.94,-,0.6,Cross,100.0,123.0,023,NN,023,Tone->Tone,FM,,\n");
        let ch = &decoded.items[0];
        assert_eq!(ch.squelch_type, SquelchType::Tsql);
        assert_eq!(ch.tx_tone.as_deref(), Some("100.0"));
        assert_eq!(ch.rx_tone.as_deref(), Some("123.0"));
    }

    #[test]
    fn test_decode_modes() {
        let decoded = decode(
            "1,A,146.52,,0,,88.5,88.5,023,NN,023,,NFM,5W,\n\
             2,B,145.5,,0,,88.5,88.5,023,NN,023,,DN,,\n\
             3,C,145.5,off,0,,88.5,88.5,023,NN,023,,DV,,\n",
        );
        assert_eq!(decoded.items[0].bandwidth, Bandwidth::Narrow);
        assert_eq!(decoded.items[0].power, Power::Low);
        assert_eq!(decoded.items[1].channel_type, ChannelType::DigitalYsf);
        assert_eq!(decoded.items[2].protocol, Protocol::Dstar);
        assert!(decoded.items[2].options.forbid_tx);
    }

    #[test]
    fn test_encode_skips_dmr() {
        let mut dmr = Channel::new("DMR", 439.5, 431.9);
        dmr.protocol = Protocol::Dmr;
        dmr.color_code = 1;
        let table = encode_channels(&[dmr, Channel::new("Simplex", 146.52, 146.52)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], "1");
        assert_eq!(table.rows[0][3], "");
        assert_eq!(table.rows[0][4], "0.000000");
    }

    #[test]
    fn test_round_trip_tracked_fields() {
        let mut split_tone = Channel::new("Split", 147.12, 147.72);
        split_tone.squelch_type = SquelchType::Tsql;
        split_tone.rx_tone = Some("123.0".to_string());
        split_tone.tx_tone = Some("100.0".to_string());
        split_tone.power = Power::Mid;

        let mut dcs = Channel::new("Dcs", 446.0, 446.0);
        dcs.squelch_type = SquelchType::Dcs;
        dcs.rx_dcs = Some("754".to_string());
        dcs.tx_dcs = Some("023".to_string());
        dcs.bandwidth = Bandwidth::Narrow;
        dcs.power = Power::Low;

        let decoded = decode_channels(&encode_channels(&[split_tone.clone(), dcs.clone()]));
        assert!(decoded.errors.is_empty());
        for (before, after) in [split_tone, dcs].iter().zip(&decoded.items) {
            assert_eq!(after.squelch_type, before.squelch_type);
            assert_eq!(after.rx_tone, before.rx_tone);
            assert_eq!(after.tx_tone, before.tx_tone);
            assert_eq!(after.rx_dcs, before.rx_dcs);
            assert_eq!(after.tx_dcs, before.tx_dcs);
            assert_eq!(after.power, before.power);
            assert_eq!(after.bandwidth, before.bandwidth);
            assert!((after.tx_frequency - before.tx_frequency).abs() < 1e-9);
        }
    }
}
