//! Talkgroup contacts and directory entries.

use serde::{Deserialize, Serialize};

/// DMR call addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CallType {
    #[default]
    Group,
    Private,
    #[serde(rename = "AllCall")]
    AllCall,
}

impl CallType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Private => "Private",
            Self::AllCall => "AllCall",
        }
    }

    /// Parse from storage or vendor spelling ("Private Call", "All Call").
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        if lower.starts_with("private") {
            Self::Private
        } else if lower.starts_with("all") {
            Self::AllCall
        } else {
            Self::Group
        }
    }

    /// Vendor label ("Group Call", "Private Call", "All Call").
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Group => "Group Call",
            Self::Private => "Private Call",
            Self::AllCall => "All Call",
        }
    }
}

/// A talkgroup, private-call or all-call address.
///
/// Negative `dmr_id` values are resolver placeholders for talkgroups that
/// were referenced by name but never given a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Store identity (0 until persisted)
    pub id: i64,

    /// DMR talkgroup or subscriber number
    pub dmr_id: i64,

    pub name: String,

    pub call_type: CallType,
}

impl Contact {
    #[must_use]
    pub fn new(dmr_id: i64, name: impl Into<String>, call_type: CallType) -> Self {
        Self {
            id: 0,
            dmr_id,
            name: name.into(),
            call_type,
        }
    }

    /// Whether this row was invented by the resolver.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.dmr_id < 0
    }
}

/// One entry of the operator directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryContact {
    /// Globally unique DMR subscriber ID
    pub dmr_id: i64,

    /// "First Last", or the call sign when both are empty
    pub name: String,

    pub callsign: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub remarks: String,

    /// Soft-delete timestamp (Unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl DirectoryContact {
    /// Build the display name from its parts.
    #[must_use]
    pub fn display_name(first: &str, last: &str, callsign: &str) -> String {
        let full = format!("{} {}", first.trim(), last.trim());
        let full = full.trim();
        if full.is_empty() {
            callsign.trim().to_string()
        } else {
            full.to_string()
        }
    }
}

/// A named set of DMR IDs used to filter directory traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowList {
    pub id: i64,
    pub name: String,
    pub entry_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_type_vendor_spellings() {
        assert_eq!(CallType::from_str("Private Call"), CallType::Private);
        assert_eq!(CallType::from_str("All Call"), CallType::AllCall);
        assert_eq!(CallType::from_str("AllCall"), CallType::AllCall);
        assert_eq!(CallType::from_str("Group Call"), CallType::Group);
        assert_eq!(CallType::from_str(""), CallType::Group);
    }

    #[test]
    fn test_display_name_falls_back_to_callsign() {
        assert_eq!(DirectoryContact::display_name("Ann", "Lee", "K1AB"), "Ann Lee");
        assert_eq!(DirectoryContact::display_name("Ann", "", "K1AB"), "Ann");
        assert_eq!(DirectoryContact::display_name(" ", "", "K1AB"), "K1AB");
    }

    #[test]
    fn test_placeholder() {
        assert!(Contact::new(-1, "Unknown", CallType::Group).is_placeholder());
        assert!(!Contact::new(91, "Worldwide", CallType::Group).is_placeholder());
    }
}
