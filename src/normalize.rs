//! Value normalizers shared by every dialect codec.
//!
//! Pure functions only. Vendor spellings are folded through lookup tables
//! first and numeric parsing second, so a new synonym is a one-line change.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::model::{Bandwidth, Channel, ChannelType, Power, Protocol, SquelchType};

// ── Lookup tables ────────────────────────────────────────────

/// Result of classifying a mode token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeClass {
    pub channel_type: ChannelType,
    pub protocol: Protocol,
    pub bandwidth: Bandwidth,
}

const ANALOG_WIDE: ModeClass = ModeClass {
    channel_type: ChannelType::Analog,
    protocol: Protocol::Fm,
    bandwidth: Bandwidth::Wide,
};

pub static MODE_TABLE: LazyLock<HashMap<&str, ModeClass>> = LazyLock::new(|| {
    let digital = |channel_type, protocol| ModeClass {
        channel_type,
        protocol,
        bandwidth: Bandwidth::Narrow,
    };
    [
        ("", ANALOG_WIDE),
        ("fm", ANALOG_WIDE),
        ("analog", ANALOG_WIDE),
        ("a-analog", ANALOG_WIDE),
        (
            "nfm",
            ModeClass {
                bandwidth: Bandwidth::Narrow,
                ..ANALOG_WIDE
            },
        ),
        (
            "am",
            ModeClass {
                protocol: Protocol::Am,
                ..ANALOG_WIDE
            },
        ),
        ("dmr", digital(ChannelType::DigitalDmr, Protocol::Dmr)),
        ("digital", digital(ChannelType::DigitalDmr, Protocol::Dmr)),
        ("d-digital", digital(ChannelType::DigitalDmr, Protocol::Dmr)),
        ("dn", digital(ChannelType::DigitalYsf, Protocol::Fusion)),
        ("ysf", digital(ChannelType::DigitalYsf, Protocol::Fusion)),
        ("fusion", digital(ChannelType::DigitalYsf, Protocol::Fusion)),
        ("c4fm", digital(ChannelType::DigitalYsf, Protocol::Fusion)),
        ("dv", digital(ChannelType::DigitalDstar, Protocol::Dstar)),
        ("dstar", digital(ChannelType::DigitalDstar, Protocol::Dstar)),
        ("d-star", digital(ChannelType::DigitalDstar, Protocol::Dstar)),
        ("p25", digital(ChannelType::DigitalP25, Protocol::P25)),
        ("nxdn", digital(ChannelType::DigitalNxdn, Protocol::Nxdn)),
    ]
    .into_iter()
    .collect()
});

pub static POWER_SYNONYMS: LazyLock<HashMap<&str, Power>> = LazyLock::new(|| {
    [
        ("high", Power::High),
        ("h", Power::High),
        ("turbo", Power::High),
        ("max", Power::High),
        ("mid", Power::Mid),
        ("m", Power::Mid),
        ("middle", Power::Mid),
        ("medium", Power::Mid),
        ("low", Power::Low),
        ("l", Power::Low),
        ("min", Power::Low),
    ]
    .into_iter()
    .collect()
});

/// Tokens meaning "no tone" across dialects.
const TONE_OFF: &[&str] = &["", "off", "none", "no", "0", "0.0"];

// ── Frequency ────────────────────────────────────────────────

/// Round a frequency in MHz to six decimals (1 Hz).
#[must_use]
pub fn round_frequency(mhz: f64) -> f64 {
    (mhz * 1_000_000.0).round() / 1_000_000.0
}

/// Parse a frequency in MHz. Accepts a trailing "MHz" unit.
#[must_use]
pub fn parse_frequency(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_suffix("MHz")
        .or_else(|| trimmed.strip_suffix("mhz"))
        .unwrap_or(trimmed)
        .trim();
    let value: f64 = trimmed.parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| round_frequency(value))
}

/// Compute the transmit frequency from a duplex direction and offset.
///
/// `+` and `-` apply the offset, `split` treats the offset as the absolute
/// transmit frequency, anything else is simplex.
#[must_use]
pub fn resolve_duplex(rx: f64, duplex: &str, offset: Option<f64>) -> f64 {
    let offset = offset.unwrap_or(0.0);
    let tx = match duplex.trim().to_lowercase().as_str() {
        "+" => rx + offset,
        "-" | "\u{2212}" => rx - offset,
        "split" if offset > 0.0 => offset,
        _ => rx,
    };
    round_frequency(tx)
}

// ── Power / mode / bandwidth ─────────────────────────────────

/// Map a power field to a level.
///
/// Wattages map by threshold (over 25 W is High, over 5 W is Mid), names go
/// through the synonym table, and anything unrecognized is High.
#[must_use]
pub fn map_power(input: &str) -> Power {
    let lower = input.trim().to_lowercase();
    let numeric = lower.strip_suffix('w').unwrap_or(&lower).trim();
    if let Some(watts) = numeric.parse::<f64>().ok().filter(|w| w.is_finite()) {
        return if watts > 25.0 {
            Power::High
        } else if watts > 5.0 {
            Power::Mid
        } else {
            Power::Low
        };
    }
    POWER_SYNONYMS.get(lower.as_str()).copied().unwrap_or_default()
}

/// Classify a mode token into family, protocol and default bandwidth.
#[must_use]
pub fn classify_mode(token: &str) -> ModeClass {
    MODE_TABLE
        .get(token.trim().to_lowercase().as_str())
        .copied()
        .unwrap_or(ANALOG_WIDE)
}

/// Parse a bandwidth column ("12.5", "12.5K", "25KHz", "NFM").
#[must_use]
pub fn parse_bandwidth(input: &str) -> Option<Bandwidth> {
    let lower = input.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if lower.starts_with("12") || lower.starts_with("6.25") || lower == "nfm" || lower == "narrow" {
        Some(Bandwidth::Narrow)
    } else if lower.starts_with("25") || lower.starts_with("20") || lower == "fm" || lower == "wide" {
        Some(Bandwidth::Wide)
    } else {
        None
    }
}

// ── DMR fields ───────────────────────────────────────────────

/// Parse a time slot ("1", "Slot 2", "Slot2", "TS1").
#[must_use]
pub fn parse_time_slot(input: &str) -> Option<u8> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u8>().ok()? {
        slot @ (1 | 2) => Some(slot),
        _ => None,
    }
}

/// Parse a color code in 0..=15.
#[must_use]
pub fn parse_color_code(input: &str) -> Option<u8> {
    input.trim().parse::<u8>().ok().filter(|cc| *cc <= 15)
}

/// Parse a vendor on/off field.
#[must_use]
pub fn parse_flag(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "1" | "on" | "true" | "yes" | "y"
    )
}

// ── Tones ────────────────────────────────────────────────────

/// Normalize a CTCSS tone to one decimal ("88.5"). Off markers give `None`.
#[must_use]
pub fn normalize_ctcss(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if TONE_OFF.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }
    let trimmed = trimmed.strip_suffix("Hz").unwrap_or(trimmed).trim();
    let hz: f64 = trimmed.parse().ok()?;
    (hz.is_finite() && hz > 0.0).then(|| format!("{hz:.1}"))
}

/// Normalize a DCS code to three digits ("D023N" and "23" both give "023").
#[must_use]
pub fn normalize_dcs(input: &str) -> Option<String> {
    let upper = input.trim().to_uppercase();
    if TONE_OFF.contains(&upper.to_lowercase().as_str()) {
        return None;
    }
    let code = upper.strip_prefix('D').unwrap_or(&upper);
    let code = code.trim_end_matches(['N', 'I', 'R']);
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: u16 = code.parse().ok()?;
    (value > 0).then(|| format!("{value:03}"))
}

/// A single tone column that may hold either CTCSS or DCS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToneCode {
    Ctcss(String),
    Dcs(String),
}

/// Split a combined CTCSS/DCS column. A leading 'D' means DCS.
#[must_use]
pub fn split_tone_code(input: &str) -> Option<ToneCode> {
    let trimmed = input.trim();
    if trimmed.starts_with(['D', 'd']) {
        normalize_dcs(trimmed).map(ToneCode::Dcs)
    } else {
        normalize_ctcss(trimmed).map(ToneCode::Ctcss)
    }
}

/// Format a DCS code the way combined columns write it ("D023N").
#[must_use]
pub fn dcs_label(code: &str) -> String {
    format!("D{code}N")
}

// ── Squelch reconciliation ───────────────────────────────────

/// Tone and DCS values read from a row before a mode is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SquelchCandidates {
    pub rx_tone: Option<String>,
    pub tx_tone: Option<String>,
    pub rx_dcs: Option<String>,
    pub tx_dcs: Option<String>,
}

/// Reconciled squelch setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Squelch {
    pub squelch_type: SquelchType,
    pub rx_tone: Option<String>,
    pub tx_tone: Option<String>,
    pub rx_dcs: Option<String>,
    pub tx_dcs: Option<String>,
}

impl SquelchCandidates {
    /// Record a combined CTCSS/DCS column on the receive side.
    pub fn set_rx(&mut self, code: Option<ToneCode>) {
        match code {
            Some(ToneCode::Ctcss(t)) => self.rx_tone = Some(t),
            Some(ToneCode::Dcs(d)) => self.rx_dcs = Some(d),
            None => {}
        }
    }

    /// Record a combined CTCSS/DCS column on the transmit side.
    pub fn set_tx(&mut self, code: Option<ToneCode>) {
        match code {
            Some(ToneCode::Ctcss(t)) => self.tx_tone = Some(t),
            Some(ToneCode::Dcs(d)) => self.tx_dcs = Some(d),
            None => {}
        }
    }

    /// Pick exactly one squelch mode.
    ///
    /// Priority: RX tone (TSQL), TX tone (Tone), either DCS (DCS, missing side
    /// copies the other), otherwise None.
    #[must_use]
    pub fn reconcile(self) -> Squelch {
        if let Some(rx) = self.rx_tone {
            let tx = self.tx_tone.unwrap_or_else(|| rx.clone());
            return Squelch {
                squelch_type: SquelchType::Tsql,
                rx_tone: Some(rx),
                tx_tone: Some(tx),
                ..Squelch::default()
            };
        }
        if let Some(tx) = self.tx_tone {
            return Squelch {
                squelch_type: SquelchType::Tone,
                tx_tone: Some(tx),
                ..Squelch::default()
            };
        }
        match (self.rx_dcs, self.tx_dcs) {
            (Some(rx), Some(tx)) => Squelch {
                squelch_type: SquelchType::Dcs,
                rx_dcs: Some(rx),
                tx_dcs: Some(tx),
                ..Squelch::default()
            },
            (Some(code), None) | (None, Some(code)) => Squelch {
                squelch_type: SquelchType::Dcs,
                rx_dcs: Some(code.clone()),
                tx_dcs: Some(code),
                ..Squelch::default()
            },
            (None, None) => Squelch::default(),
        }
    }
}

impl Squelch {
    /// Copy onto a channel.
    pub fn apply(self, channel: &mut Channel) {
        channel.squelch_type = self.squelch_type;
        channel.rx_tone = self.rx_tone;
        channel.tx_tone = self.tx_tone;
        channel.rx_dcs = self.rx_dcs;
        channel.tx_dcs = self.tx_dcs;
    }
}

/// Decompose a cross-mode descriptor ("Tone->DTCS", "->Tone") into candidates.
///
/// The left side is transmit, the right side receive. `r_tone` is the
/// transmit CTCSS, `c_tone` the receive CTCSS, `dtcs` the transmit code and
/// `rx_dtcs` the receive code.
#[must_use]
pub fn cross_candidates(
    descriptor: &str,
    r_tone: Option<String>,
    c_tone: Option<String>,
    dtcs: Option<String>,
    rx_dtcs: Option<String>,
) -> SquelchCandidates {
    let normalized = descriptor.replace('\u{2192}', "->");
    let (tx_side, rx_side) = normalized.split_once("->").unwrap_or((normalized.as_str(), ""));
    let mut candidates = SquelchCandidates::default();
    match tx_side.trim().to_lowercase().as_str() {
        "tone" => candidates.tx_tone = r_tone,
        "dtcs" => candidates.tx_dcs = dtcs,
        _ => {}
    }
    match rx_side.trim().to_lowercase().as_str() {
        "tone" => candidates.rx_tone = c_tone,
        "dtcs" => candidates.rx_dcs = rx_dtcs,
        _ => {}
    }
    candidates
}
