//! Named, ordered collections and the codeplug snapshot.

use serde::{Deserialize, Serialize};

use super::{Channel, Contact, DirectoryContact};

/// Which kind of named collection a row belongs to.
///
/// Each kind has its own table and join table; the membership protocol is
/// written once against these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Zone,
    ScanList,
    RoamingZone,
}

impl CollectionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zone => "zone",
            Self::ScanList => "scan_list",
            Self::RoamingZone => "roaming_zone",
        }
    }

    /// Table holding the collection rows.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Zone => "zones",
            Self::ScanList => "scan_lists",
            Self::RoamingZone => "roaming_zones",
        }
    }

    /// Join table holding `(collection_id, member_id, position)`.
    #[must_use]
    pub const fn join_table(&self) -> &'static str {
        match self {
            Self::Zone => "zone_channels",
            Self::ScanList => "scan_list_channels",
            Self::RoamingZone => "roaming_zone_channels",
        }
    }

    /// Table the members live in.
    #[must_use]
    pub const fn member_table(&self) -> &'static str {
        match self {
            Self::Zone | Self::ScanList => "channels",
            Self::RoamingZone => "roaming_channels",
        }
    }

    /// Whether member order carries meaning.
    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        matches!(self, Self::Zone)
    }
}

/// A zone, scan list or roaming zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub kind: CollectionKind,
    pub name: String,
    /// Member row ids in position order
    pub member_ids: Vec<i64>,
}

pub type Zone = Collection;
pub type ScanList = Collection;
pub type RoamingZone = Collection;

/// A DMR repeater entry used for roaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoamingChannel {
    pub id: i64,
    pub name: String,
    pub rx_frequency: f64,
    pub tx_frequency: f64,
    pub color_code: u8,
    pub time_slot: u8,
}

impl RoamingChannel {
    #[must_use]
    pub fn new(name: impl Into<String>, rx_frequency: f64, tx_frequency: f64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            rx_frequency,
            tx_frequency,
            color_code: 1,
            time_slot: 1,
        }
    }
}

/// A decoded collection whose members are still names.
///
/// Files reference members by name; ids are assigned when the orchestrator
/// matches names against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub name: String,
    pub members: Vec<String>,
}

impl Grouping {
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

/// Everything an encoder needs, with membership already resolved to names.
#[derive(Debug, Clone, Default)]
pub struct Codeplug {
    pub channels: Vec<Channel>,
    pub contacts: Vec<Contact>,
    pub directory: Vec<DirectoryContact>,
    pub zones: Vec<Grouping>,
    pub scan_lists: Vec<Grouping>,
    pub roaming_channels: Vec<RoamingChannel>,
    pub roaming_zones: Vec<Grouping>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tables() {
        assert_eq!(CollectionKind::Zone.join_table(), "zone_channels");
        assert_eq!(CollectionKind::RoamingZone.member_table(), "roaming_channels");
        assert!(CollectionKind::Zone.is_ordered());
        assert!(!CollectionKind::ScanList.is_ordered());
    }
}
