//! Dialect codecs.
//!
//! Each dialect module exposes pure `decode_*` / `encode_*` functions over
//! `RawTable`. This module holds the pieces they share and the `Dialect`
//! dispatch used by the transfer layer:
//!
//! - **generic**: Generic / DB25-D channels and Name/ID/Type talkgroups
//! - **chirp**: CHIRP memories
//! - **anytone**: AnyTone 890 CPS archive members
//! - **dm32uv**: DM32UV CPS archive members
//! - **radioid**: RadioID directory dump, last-heard and filter lists

pub mod anytone;
pub mod chirp;
pub mod dm32uv;
pub mod generic;
pub mod radioid;
pub mod table;

use serde::Serialize;

use crate::model::{Channel, Codeplug, Contact, DirectoryContact, Grouping, RoamingChannel};
use crate::normalize::{parse_color_code, parse_frequency, parse_time_slot};

pub use table::{
    parse_table, read_table, render_table, write_table, Aliases, Decoded, HeaderIndex, RawTable,
    RowError, TableStyle,
};

/// Errors that make a whole table unreadable.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing header row")]
    MissingHeader,

    #[error("unrecognized layout: {0}")]
    UnrecognizedLayout(String),

    #[error("{dialect} does not carry {entity}")]
    Unsupported { dialect: Dialect, entity: Entity },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

// ── Shared row helpers ───────────────────────────────────────

/// Free-text reference column; vendor "None"/"Off" markers mean absent.
pub(crate) fn reference(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("off") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Validate a decoded channel, turning a violation into a row error.
pub(crate) fn finish_channel(channel: Channel) -> std::result::Result<Option<Channel>, String> {
    channel.validate().map_err(|e| e.to_string())?;
    Ok(Some(channel))
}

pub(crate) fn join_members(members: &[String]) -> String {
    members.join("|")
}

pub(crate) fn split_members(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Decode "No., Name, A|B|C" style collection tables.
pub(crate) fn decode_groupings(table: &RawTable, name: Aliases, members: Aliases) -> Decoded<Grouping> {
    Decoded::collect(table, |index, row| {
        let group = index.get(row, name).ok_or("missing collection name")?;
        Ok(Some(Grouping::new(
            group,
            split_members(index.text(row, members)),
        )))
    })
}

/// Encode "No., Name, A|B|C" style collection tables.
pub(crate) fn encode_groupings(headers: &[&str], groups: &[Grouping]) -> RawTable {
    let mut table = RawTable::with_headers(headers);
    for (i, group) in groups.iter().enumerate() {
        table.push_row(vec![
            (i + 1).to_string(),
            group.name.clone(),
            join_members(&group.members),
        ]);
    }
    table
}

/// Column aliases for a roaming channel table.
pub(crate) struct RoamingColumns {
    pub name: Aliases,
    pub rx: Aliases,
    pub tx: Aliases,
    pub color_code: Aliases,
    pub time_slot: Aliases,
}

pub(crate) fn decode_roaming_channels(table: &RawTable, cols: &RoamingColumns) -> Decoded<RoamingChannel> {
    Decoded::collect(table, |index, row| {
        let name = index.get(row, cols.name).ok_or("missing roaming channel name")?;
        let rx = index
            .get(row, cols.rx)
            .and_then(parse_frequency)
            .ok_or_else(|| format!("roaming channel '{name}' has no usable receive frequency"))?;
        let mut rc = RoamingChannel::new(
            name,
            rx,
            index.get(row, cols.tx).and_then(parse_frequency).unwrap_or(rx),
        );
        rc.color_code = index
            .get(row, cols.color_code)
            .and_then(parse_color_code)
            .filter(|cc| *cc >= 1)
            .unwrap_or(1);
        rc.time_slot = index.get(row, cols.time_slot).and_then(parse_time_slot).unwrap_or(1);
        Ok(Some(rc))
    })
}

/// Column aliases for a digital contact table.
pub(crate) struct DirectoryColumns {
    pub dmr_id: Aliases,
    pub callsign: Aliases,
    pub name: Aliases,
    pub city: Aliases,
    pub state: Aliases,
    pub country: Aliases,
    pub remarks: Aliases,
}

pub(crate) fn decode_directory(table: &RawTable, cols: &DirectoryColumns) -> Decoded<DirectoryContact> {
    Decoded::collect(table, |index, row| {
        let raw = index.get(row, cols.dmr_id).ok_or("missing DMR ID")?;
        let dmr_id: i64 = raw.parse().map_err(|_| format!("invalid DMR ID '{raw}'"))?;
        let callsign = index.text(row, cols.callsign);
        let name = index
            .get(row, cols.name)
            .map_or_else(|| callsign.to_string(), ToString::to_string);
        Ok(Some(DirectoryContact {
            dmr_id,
            name,
            callsign: callsign.to_string(),
            city: index.text(row, cols.city).to_string(),
            state: index.text(row, cols.state).to_string(),
            country: index.text(row, cols.country).to_string(),
            remarks: index.text(row, cols.remarks).to_string(),
            deleted_at: None,
        }))
    })
}

// ── Dialect dispatch ─────────────────────────────────────────

/// Supported file layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Generic,
    Chirp,
    #[serde(rename = "anytone")]
    AnyTone,
    Dm32uv,
    #[serde(rename = "radioid")]
    RadioId,
}

/// Kind of entity a table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    DigitalContacts,
    Talkgroups,
    Channels,
    Zones,
    ScanLists,
    RoamingChannels,
    RoamingZones,
}

impl Entity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalContacts => "digital_contacts",
            Self::Talkgroups => "talkgroups",
            Self::Channels => "channels",
            Self::Zones => "zones",
            Self::ScanLists => "scan_lists",
            Self::RoamingChannels => "roaming_channels",
            Self::RoamingZones => "roaming_zones",
        }
    }

    /// Parse from the CLI/storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "digital_contacts" | "directory" | "contacts" => Some(Self::DigitalContacts),
            "talkgroups" | "talk_groups" => Some(Self::Talkgroups),
            "channels" => Some(Self::Channels),
            "zones" => Some(Self::Zones),
            "scan_lists" | "scanlists" => Some(Self::ScanLists),
            "roaming_channels" => Some(Self::RoamingChannels),
            "roaming_zones" => Some(Self::RoamingZones),
            _ => None,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ANYTONE_MEMBERS: &[(Entity, &str)] = &[
    (Entity::DigitalContacts, "DMRDigitalContactList.CSV"),
    (Entity::Talkgroups, "DMRTalkGroups.CSV"),
    (Entity::Channels, "Channel.CSV"),
    (Entity::Zones, "DMRZone.CSV"),
    (Entity::ScanLists, "ScanList.CSV"),
    (Entity::RoamingChannels, "RoamChannel.CSV"),
    (Entity::RoamingZones, "RoamZone.CSV"),
];

const DM32UV_MEMBERS: &[(Entity, &str)] = &[
    (Entity::DigitalContacts, "digital_contacts.csv"),
    (Entity::Talkgroups, "talkgroups.csv"),
    (Entity::Channels, "channels.csv"),
    (Entity::Zones, "zones.csv"),
    (Entity::ScanLists, "scan_lists.csv"),
    (Entity::RoamingChannels, "roaming_channels.csv"),
    (Entity::RoamingZones, "roaming_zones.csv"),
];

const GENERIC_MEMBERS: &[(Entity, &str)] = &[
    (Entity::Talkgroups, "talkgroups.csv"),
    (Entity::Channels, "channels.csv"),
];

const CHIRP_MEMBERS: &[(Entity, &str)] = &[(Entity::Channels, "channels.csv")];

const RADIOID_MEMBERS: &[(Entity, &str)] = &[(Entity::DigitalContacts, "user.csv")];

impl Dialect {
    pub const ALL: [Self; 5] = [Self::Generic, Self::Chirp, Self::AnyTone, Self::Dm32uv, Self::RadioId];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Chirp => "chirp",
            Self::AnyTone => "anytone",
            Self::Dm32uv => "dm32uv",
            Self::RadioId => "radioid",
        }
    }

    /// Parse a dialect name, accepting the common vendor aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "db25d" | "db25-d" | "csv" => Some(Self::Generic),
            "chirp" => Some(Self::Chirp),
            "anytone" | "at890" | "anytone890" | "at-d890uv" => Some(Self::AnyTone),
            "dm32uv" | "dm32" | "dm-32uv" => Some(Self::Dm32uv),
            "radioid" | "radio_id" => Some(Self::RadioId),
            _ => None,
        }
    }

    /// Archive members in dependency order: contacts before the channels
    /// that reference them, channels before the collections that hold them.
    #[must_use]
    pub const fn members(&self) -> &'static [(Entity, &'static str)] {
        match self {
            Self::Generic => GENERIC_MEMBERS,
            Self::Chirp => CHIRP_MEMBERS,
            Self::AnyTone => ANYTONE_MEMBERS,
            Self::Dm32uv => DM32UV_MEMBERS,
            Self::RadioId => RADIOID_MEMBERS,
        }
    }

    /// Member file name for an entity, if this dialect carries it.
    #[must_use]
    pub fn member_name(&self, entity: Entity) -> Option<&'static str> {
        self.members()
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, name)| *name)
    }

    #[must_use]
    pub const fn table_style(&self) -> TableStyle {
        match self {
            Self::AnyTone => TableStyle::QuotedCrlf,
            _ => TableStyle::Standard,
        }
    }

    /// Whether this dialect can be written.
    #[must_use]
    pub const fn can_encode(&self) -> bool {
        !matches!(self, Self::RadioId)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the channel layout a header belongs to.
///
/// Each dialect requires its own minimum set of columns. More specific
/// layouts are tried first; a header that satisfies none is rejected
/// rather than guessed.
///
/// # Errors
///
/// Returns `CodecError::UnrecognizedLayout` when no layout matches.
pub fn sniff_channels(table: &RawTable) -> CodecResult<Dialect> {
    let index = table.index();
    let detected = if anytone::sniff_channels(&index) {
        Dialect::AnyTone
    } else if dm32uv::sniff_channels(&index) {
        Dialect::Dm32uv
    } else if chirp::sniff_channels(&index) {
        Dialect::Chirp
    } else if generic::sniff_channels(&index) {
        Dialect::Generic
    } else {
        return Err(CodecError::UnrecognizedLayout(format!(
            "header [{}] matches no known channel layout",
            table.headers.join(", ")
        )));
    };
    tracing::debug!(dialect = detected.as_str(), "Detected channel layout");
    Ok(detected)
}

/// Pick the dialect for a single file, trying the directory dump first.
///
/// # Errors
///
/// See [`sniff_channels`].
pub fn sniff(table: &RawTable) -> CodecResult<(Dialect, Entity)> {
    if radioid::sniff(&table.index()) {
        return Ok((Dialect::RadioId, Entity::DigitalContacts));
    }
    sniff_channels(table).map(|d| (d, Entity::Channels))
}

/// Output of one decode, tagged by entity kind.
#[derive(Debug, Clone)]
pub enum DecodedBatch {
    Channels(Decoded<Channel>),
    Contacts(Decoded<Contact>),
    Directory(Decoded<DirectoryContact>),
    Groupings(Entity, Decoded<Grouping>),
    RoamingChannels(Decoded<RoamingChannel>),
}

impl DecodedBatch {
    /// Rows that decoded cleanly.
    #[must_use]
    pub fn accepted(&self) -> usize {
        match self {
            Self::Channels(d) => d.items.len(),
            Self::Contacts(d) => d.items.len(),
            Self::Directory(d) => d.items.len(),
            Self::Groupings(_, d) => d.items.len(),
            Self::RoamingChannels(d) => d.items.len(),
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[RowError] {
        match self {
            Self::Channels(d) => &d.errors,
            Self::Contacts(d) => &d.errors,
            Self::Directory(d) => &d.errors,
            Self::Groupings(_, d) => &d.errors,
            Self::RoamingChannels(d) => &d.errors,
        }
    }
}

/// Decode a table as `entity` in `dialect`.
///
/// # Errors
///
/// Returns `CodecError::Unsupported` when the dialect has no such member.
pub fn decode(dialect: Dialect, entity: Entity, table: &RawTable) -> CodecResult<DecodedBatch> {
    use Dialect as D;
    use Entity as E;
    let batch = match (dialect, entity) {
        (D::Generic, E::Channels) => DecodedBatch::Channels(generic::decode_channels(table)),
        (D::Generic, E::Talkgroups) => DecodedBatch::Contacts(generic::decode_talkgroups(table)),
        (D::Chirp, E::Channels) => DecodedBatch::Channels(chirp::decode_channels(table)),
        (D::AnyTone, E::Channels) => DecodedBatch::Channels(anytone::decode_channels(table)),
        (D::AnyTone, E::Talkgroups) => DecodedBatch::Contacts(anytone::decode_talkgroups(table)),
        (D::AnyTone, E::Zones) => DecodedBatch::Groupings(entity, anytone::decode_zones(table)),
        (D::AnyTone, E::ScanLists) => DecodedBatch::Groupings(entity, anytone::decode_scan_lists(table)),
        (D::AnyTone, E::DigitalContacts) => {
            DecodedBatch::Directory(anytone::decode_digital_contacts(table))
        }
        (D::AnyTone, E::RoamingChannels) => {
            DecodedBatch::RoamingChannels(anytone::decode_roaming_channels(table))
        }
        (D::AnyTone, E::RoamingZones) => {
            DecodedBatch::Groupings(entity, anytone::decode_roaming_zones(table))
        }
        (D::Dm32uv, E::Channels) => DecodedBatch::Channels(dm32uv::decode_channels(table)),
        (D::Dm32uv, E::Talkgroups) => DecodedBatch::Contacts(dm32uv::decode_talkgroups(table)),
        (D::Dm32uv, E::Zones) => DecodedBatch::Groupings(entity, dm32uv::decode_zones(table)),
        (D::Dm32uv, E::ScanLists) => DecodedBatch::Groupings(entity, dm32uv::decode_scan_lists(table)),
        (D::Dm32uv, E::DigitalContacts) => {
            DecodedBatch::Directory(dm32uv::decode_digital_contacts(table))
        }
        (D::Dm32uv, E::RoamingChannels) => {
            DecodedBatch::RoamingChannels(dm32uv::decode_roaming_channels(table))
        }
        (D::Dm32uv, E::RoamingZones) => {
            DecodedBatch::Groupings(entity, dm32uv::decode_roaming_zones(table))
        }
        (D::RadioId, E::DigitalContacts) => DecodedBatch::Directory(radioid::decode(table, None)),
        _ => return Err(CodecError::Unsupported { dialect, entity }),
    };
    Ok(batch)
}

/// Encode `entity` from a snapshot.
///
/// # Errors
///
/// Returns `CodecError::Unsupported` when the dialect has no such member.
pub fn encode(dialect: Dialect, entity: Entity, plug: &Codeplug) -> CodecResult<RawTable> {
    use Dialect as D;
    use Entity as E;
    let table = match (dialect, entity) {
        (D::Generic, E::Channels) => generic::encode_channels(&plug.channels),
        (D::Generic, E::Talkgroups) => generic::encode_talkgroups(&plug.contacts),
        (D::Chirp, E::Channels) => chirp::encode_channels(&plug.channels),
        (D::AnyTone, E::Channels) => anytone::encode_channels(&plug.channels, &plug.contacts),
        (D::AnyTone, E::Talkgroups) => anytone::encode_talkgroups(&plug.contacts),
        (D::AnyTone, E::Zones) => anytone::encode_zones(&plug.zones, &plug.channels),
        (D::AnyTone, E::ScanLists) => anytone::encode_scan_lists(&plug.scan_lists),
        (D::AnyTone, E::DigitalContacts) => anytone::encode_digital_contacts(&plug.directory),
        (D::AnyTone, E::RoamingChannels) => anytone::encode_roaming_channels(&plug.roaming_channels),
        (D::AnyTone, E::RoamingZones) => anytone::encode_roaming_zones(&plug.roaming_zones),
        (D::Dm32uv, E::Channels) => dm32uv::encode_channels(&plug.channels),
        (D::Dm32uv, E::Talkgroups) => dm32uv::encode_talkgroups(&plug.contacts),
        (D::Dm32uv, E::Zones) => dm32uv::encode_zones(&plug.zones),
        (D::Dm32uv, E::ScanLists) => dm32uv::encode_scan_lists(&plug.scan_lists),
        (D::Dm32uv, E::DigitalContacts) => dm32uv::encode_digital_contacts(&plug.directory),
        (D::Dm32uv, E::RoamingChannels) => dm32uv::encode_roaming_channels(&plug.roaming_channels),
        (D::Dm32uv, E::RoamingZones) => dm32uv::encode_roaming_zones(&plug.roaming_zones),
        _ => return Err(CodecError::Unsupported { dialect, entity }),
    };
    Ok(table)
}
