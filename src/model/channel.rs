//! Channel model.
//!
//! A channel is one programmable memory slot. Every dialect decodes into
//! this shape and encodes out of it, so the enums below carry the storage
//! spelling (`as_str`) and a lenient parser (`from_str`) for each value.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Channel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChannelType {
    #[default]
    #[serde(rename = "Analog")]
    Analog,
    #[serde(rename = "Digital (DMR)")]
    DigitalDmr,
    #[serde(rename = "Digital (YSF)")]
    DigitalYsf,
    #[serde(rename = "Digital (D-Star)")]
    DigitalDstar,
    #[serde(rename = "Digital (NXDN)")]
    DigitalNxdn,
    #[serde(rename = "Digital (P25)")]
    DigitalP25,
    #[serde(rename = "Mixed")]
    Mixed,
}

impl ChannelType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Analog => "Analog",
            Self::DigitalDmr => "Digital (DMR)",
            Self::DigitalYsf => "Digital (YSF)",
            Self::DigitalDstar => "Digital (D-Star)",
            Self::DigitalNxdn => "Digital (NXDN)",
            Self::DigitalP25 => "Digital (P25)",
            Self::Mixed => "Mixed",
        }
    }

    /// Parse from string. Unknown values fall back to analog.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "digital (dmr)" | "dmr" => Self::DigitalDmr,
            "digital (ysf)" | "ysf" => Self::DigitalYsf,
            "digital (d-star)" | "d-star" => Self::DigitalDstar,
            "digital (nxdn)" | "nxdn" => Self::DigitalNxdn,
            "digital (p25)" | "p25" => Self::DigitalP25,
            "mixed" => Self::Mixed,
            _ => Self::Analog,
        }
    }

    /// Whether this is a digital (or mixed) family.
    #[must_use]
    pub const fn is_digital(&self) -> bool {
        !matches!(self, Self::Analog)
    }
}

/// Air interface protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Protocol {
    #[default]
    #[serde(rename = "FM")]
    Fm,
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "DMR")]
    Dmr,
    #[serde(rename = "Fusion")]
    Fusion,
    #[serde(rename = "D-Star")]
    Dstar,
    #[serde(rename = "NXDN")]
    Nxdn,
    #[serde(rename = "P25")]
    P25,
}

impl Protocol {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fm => "FM",
            Self::Am => "AM",
            Self::Dmr => "DMR",
            Self::Fusion => "Fusion",
            Self::Dstar => "D-Star",
            Self::Nxdn => "NXDN",
            Self::P25 => "P25",
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "am" => Self::Am,
            "dmr" => Self::Dmr,
            "fusion" => Self::Fusion,
            "d-star" => Self::Dstar,
            "nxdn" => Self::Nxdn,
            "p25" => Self::P25,
            _ => Self::Fm,
        }
    }
}

/// Occupied bandwidth in kHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Bandwidth {
    #[serde(rename = "12.5")]
    Narrow,
    #[default]
    #[serde(rename = "25")]
    Wide,
}

impl Bandwidth {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Narrow => "12.5",
            Self::Wide => "25",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        if s.trim().starts_with("12") {
            Self::Narrow
        } else {
            Self::Wide
        }
    }
}

/// Transmit power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Power {
    #[default]
    High,
    Mid,
    Low,
}

impl Power {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Mid => "Mid",
            Self::Low => "Low",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "mid" => Self::Mid,
            "low" => Self::Low,
            _ => Self::High,
        }
    }

    /// Representative wattage used by dialects that store watts.
    #[must_use]
    pub const fn watts(&self) -> &'static str {
        match self {
            Self::High => "50W",
            Self::Mid => "25W",
            Self::Low => "5W",
        }
    }
}

/// How the receiver is gated and what the transmitter sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SquelchType {
    #[default]
    None,
    Tone,
    #[serde(rename = "TSQL")]
    Tsql,
    #[serde(rename = "DCS")]
    Dcs,
    Cross,
}

impl SquelchType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Tone => "Tone",
            Self::Tsql => "TSQL",
            Self::Dcs => "DCS",
            Self::Cross => "Cross",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "tone" => Self::Tone,
            "tsql" => Self::Tsql,
            "dcs" | "dtcs" => Self::Dcs,
            "cross" => Self::Cross,
            _ => Self::None,
        }
    }
}

/// Vendor extras that have no canonical column.
///
/// Stored as JSON so one dialect's settings survive a round trip through the
/// store without widening the channel table for every vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squelch_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aprs_report_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub forbid_tx: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub aprs_receive: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub forbid_talkaround: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_scan: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub lone_work: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub emergency_indicator: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub emergency_ack: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub talk_around: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub work_alone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_lock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtmf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone2_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone5_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptt_id: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ChannelOptions {
    /// Serialize for the `options` column.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the `options` column. Corrupt JSON reads as empty options.
    #[must_use]
    pub fn from_json(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }
}

/// A programmable memory slot in the canonical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Store identity (0 until persisted)
    pub id: i64,

    /// Display order; renumbering rewrites this to match `id`
    pub sort_order: i64,

    /// Display name
    pub name: String,

    /// Receive frequency in MHz, six decimals
    pub rx_frequency: f64,

    /// Transmit frequency in MHz, six decimals
    pub tx_frequency: f64,

    pub channel_type: ChannelType,
    pub protocol: Protocol,
    pub bandwidth: Bandwidth,
    pub power: Power,
    pub squelch_type: SquelchType,

    pub rx_tone: Option<String>,
    pub tx_tone: Option<String>,
    pub rx_dcs: Option<String>,
    pub tx_dcs: Option<String>,

    /// DMR color code, 0 when unset
    pub color_code: u8,

    /// DMR time slot
    pub time_slot: u8,

    /// Talkgroup name as written in the source file
    pub tx_contact: Option<String>,

    /// Resolved talkgroup row
    pub contact_id: Option<i64>,

    pub rx_group: Option<String>,
    pub scan_list: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    pub options: ChannelOptions,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            id: 0,
            sort_order: 0,
            name: String::new(),
            rx_frequency: 0.0,
            tx_frequency: 0.0,
            channel_type: ChannelType::Analog,
            protocol: Protocol::Fm,
            bandwidth: Bandwidth::Wide,
            power: Power::High,
            squelch_type: SquelchType::None,
            rx_tone: None,
            tx_tone: None,
            rx_dcs: None,
            tx_dcs: None,
            color_code: 0,
            time_slot: 1,
            tx_contact: None,
            contact_id: None,
            rx_group: None,
            scan_list: None,
            notes: None,
            options: ChannelOptions::default(),
        }
    }
}

impl Channel {
    /// Create an analog FM channel with the given frequencies.
    #[must_use]
    pub fn new(name: impl Into<String>, rx_frequency: f64, tx_frequency: f64) -> Self {
        Self {
            name: name.into(),
            rx_frequency,
            tx_frequency,
            ..Self::default()
        }
    }

    /// Whether this channel is DMR.
    #[must_use]
    pub fn is_dmr(&self) -> bool {
        self.protocol == Protocol::Dmr
    }

    /// Transmit offset (tx - rx) in MHz.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.tx_frequency - self.rx_frequency
    }

    /// Check the model constraints.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name".to_string(),
                message: "channel name is empty".to_string(),
            });
        }
        for (field, value) in [("rx_frequency", self.rx_frequency), ("tx_frequency", self.tx_frequency)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation {
                    field: field.to_string(),
                    message: format!("{value} is not a valid frequency"),
                });
            }
        }
        if self.is_dmr() {
            if !(1..=15).contains(&self.color_code) {
                return Err(Error::Validation {
                    field: "color_code".to_string(),
                    message: format!(
                        "DMR channel '{}' needs a color code between 1 and 15, got {}",
                        self.name, self.color_code
                    ),
                });
            }
            if !matches!(self.time_slot, 1 | 2) {
                return Err(Error::Validation {
                    field: "time_slot".to_string(),
                    message: format!(
                        "DMR channel '{}' needs time slot 1 or 2, got {}",
                        self.name, self.time_slot
                    ),
                });
            }
        }
        Ok(())
    }

    /// Bandwidth implied by the channel family.
    #[must_use]
    pub const fn expected_bandwidth(&self) -> Bandwidth {
        if self.channel_type.is_digital() {
            Bandwidth::Narrow
        } else {
            Bandwidth::Wide
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dmr(cc: u8, ts: u8) -> Channel {
        Channel {
            channel_type: ChannelType::DigitalDmr,
            protocol: Protocol::Dmr,
            bandwidth: Bandwidth::Narrow,
            color_code: cc,
            time_slot: ts,
            ..Channel::new("Local TG", 439.5, 431.9)
        }
    }

    #[test]
    fn test_validate_dmr_color_code() {
        assert!(dmr(1, 1).validate().is_ok());
        assert!(dmr(15, 2).validate().is_ok());
        assert!(matches!(
            dmr(0, 1).validate(),
            Err(Error::Validation { field, .. }) if field == "color_code"
        ));
        assert!(dmr(16, 1).validate().is_err());
    }

    #[test]
    fn test_validate_dmr_time_slot() {
        assert!(matches!(
            dmr(1, 3).validate(),
            Err(Error::Validation { field, .. }) if field == "time_slot"
        ));
    }

    #[test]
    fn test_analog_ignores_color_code() {
        let ch = Channel::new("Simplex", 146.52, 146.52);
        assert_eq!(ch.color_code, 0);
        assert!(ch.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(Channel::new("  ", 146.52, 146.52).validate().is_err());
    }

    #[test]
    fn test_enum_storage_strings() {
        assert_eq!(ChannelType::from_str("Digital (DMR)"), ChannelType::DigitalDmr);
        assert_eq!(ChannelType::DigitalDstar.as_str(), "Digital (D-Star)");
        assert_eq!(Protocol::from_str("d-star"), Protocol::Dstar);
        assert_eq!(Bandwidth::from_str("12.5"), Bandwidth::Narrow);
        assert_eq!(Bandwidth::from_str("25"), Bandwidth::Wide);
        assert_eq!(SquelchType::from_str("DTCS"), SquelchType::Dcs);
        assert_eq!(Power::Mid.watts(), "25W");
    }

    #[test]
    fn test_options_json() {
        let opts = ChannelOptions {
            squelch_level: Some(5),
            forbid_tx: true,
            ..ChannelOptions::default()
        };
        let json = opts.to_json().unwrap();
        assert!(!json.contains("lone_work"));
        assert_eq!(ChannelOptions::from_json(&json), opts);
        assert_eq!(ChannelOptions::from_json("not json"), ChannelOptions::default());
    }
}
