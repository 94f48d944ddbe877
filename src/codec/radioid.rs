//! Operator directory feeds.
//!
//! The RadioID `user.csv` dump is import only. Two auxiliary parsers read
//! ID sets: a Brandmeister "last heard" export and a plain filter list.

use std::collections::HashSet;

use crate::model::DirectoryContact;

use super::table::{Aliases, Decoded, HeaderIndex, RawTable};
use super::{CodecError, CodecResult};

/// Public RadioID user dump.
pub const DEFAULT_FEED_URL: &str = "https://database.radioid.net/static/user.csv";

const RADIO_ID: Aliases = &["radio_id", "radio id", "id"];
const FIRST_NAME: Aliases = &["first_name", "first name", "firstname"];
const LAST_NAME: Aliases = &["last_name", "last name", "lastname"];
const CALLSIGN: Aliases = &["callsign"];
const CITY: Aliases = &["city"];
const STATE: Aliases = &["state"];
const COUNTRY: Aliases = &["country"];
const REMARKS: Aliases = &["remarks"];

const LAST_HEARD_ID: Aliases = &["sending id", "radio id", "id"];

/// Whether a header looks like a directory dump.
#[must_use]
pub fn sniff(index: &HeaderIndex) -> bool {
    index.has(RADIO_ID) && index.has(CALLSIGN) && (index.has(FIRST_NAME) || index.has(CITY))
}

/// Decode a directory dump.
///
/// With an allow set, IDs outside it are skipped silently; they are not
/// errors.
#[must_use]
pub fn decode(table: &RawTable, allow: Option<&HashSet<i64>>) -> Decoded<DirectoryContact> {
    Decoded::collect(table, |index, row| {
        let raw = index.get(row, RADIO_ID).ok_or("missing radio ID")?;
        let dmr_id: i64 = raw
            .parse()
            .map_err(|_| format!("invalid radio ID '{raw}'"))?;
        if allow.is_some_and(|ids| !ids.contains(&dmr_id)) {
            return Ok(None);
        }
        let callsign = index.text(row, CALLSIGN);
        Ok(Some(DirectoryContact {
            dmr_id,
            name: DirectoryContact::display_name(
                index.text(row, FIRST_NAME),
                index.text(row, LAST_NAME),
                callsign,
            ),
            callsign: callsign.to_string(),
            city: index.text(row, CITY).to_string(),
            state: index.text(row, STATE).to_string(),
            country: index.text(row, COUNTRY).to_string(),
            remarks: index.text(row, REMARKS).to_string(),
            deleted_at: None,
        }))
    })
}

/// Read the IDs from a Brandmeister "last heard" export.
///
/// The ID column is "Sending ID", "Radio ID" or "ID", else the first column.
/// Unparseable cells are ignored.
#[must_use]
pub fn parse_last_heard(table: &RawTable) -> HashSet<i64> {
    let column = table.index().position(LAST_HEARD_ID).unwrap_or(0);
    table
        .rows
        .iter()
        .filter_map(|row| row.get(column)?.trim().parse::<i64>().ok())
        .collect()
}

/// Read a filter list: a CSV with an ID column, or a header-less ID list.
///
/// # Errors
///
/// Returns `CodecError::UnrecognizedLayout` when no ID column can be found
/// and the first row is not itself an ID.
pub fn parse_filter_list(table: &RawTable) -> CodecResult<HashSet<i64>> {
    let positive = |cell: &String| cell.trim().parse::<i64>().ok().filter(|id| *id > 0);

    let detected = table.headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        h.contains("radio id") || h.contains("dmr id") || h == "id"
    });

    let (column, header_is_data) = match detected {
        Some(column) => (column, false),
        None if table.headers.first().and_then(positive).is_some() => (0, true),
        None => {
            return Err(CodecError::UnrecognizedLayout(format!(
                "no ID column in header [{}]",
                table.headers.join(", ")
            )))
        }
    };

    let mut ids: HashSet<i64> = table
        .rows
        .iter()
        .filter_map(|row| row.get(column).and_then(positive))
        .collect();
    if header_is_data {
        ids.extend(table.headers.get(column).and_then(positive));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::table::parse_table;

    const FEED: &str = "RADIO_ID,CALLSIGN,FIRST_NAME,LAST_NAME,CITY,STATE,COUNTRY,REMARKS\n\
                        3100001,K1AB,Ann,Lee,Boston,MA,United States,\n\
                        3100002,K1CD,,,Salem,MA,United States,club\n\
                        notanid,K1EF,Bob,,,,,\n\
                        666,N0EVL,Mark,,Hell,MI,United States,\n";

    #[test]
    fn test_decode_feed() {
        let decoded = decode(&parse_table(FEED).unwrap(), None);
        assert_eq!(decoded.items.len(), 3);
        assert_eq!(decoded.items[0].name, "Ann Lee");
        assert_eq!(decoded.items[1].name, "K1CD");
        assert_eq!(decoded.items[1].remarks, "club");
        assert_eq!(decoded.errors.len(), 1);
    }

    #[test]
    fn test_decode_with_allow_set() {
        let allow: HashSet<i64> = [666].into_iter().collect();
        let decoded = decode(&parse_table(FEED).unwrap(), Some(&allow));
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.items[0].dmr_id, 666);
    }

    #[test]
    fn test_sniff() {
        assert!(sniff(&parse_table(FEED).unwrap().index()));
        assert!(!sniff(&parse_table("Name,ID,Type\n").unwrap().index()));
    }

    #[test]
    fn test_last_heard() {
        let table = parse_table("Time,Sending ID,Talkgroup\n12:00,3100001,91\n12:01,x,91\n").unwrap();
        let ids = parse_last_heard(&table);
        assert_eq!(ids, [3_100_001].into_iter().collect());

        let fallback = parse_last_heard(&parse_table("a,b\n42,x\n").unwrap());
        assert!(fallback.contains(&42));
    }

    #[test]
    fn test_filter_list_variants() {
        let with_header = parse_table("Callsign,DMR ID\nK1AB,3100001\nK1CD,0\n").unwrap();
        assert_eq!(parse_filter_list(&with_header).unwrap().len(), 1);

        let bare = parse_table("3100001\n3100002\n").unwrap();
        let ids = parse_filter_list(&bare).unwrap();
        assert!(ids.contains(&3_100_001) && ids.contains(&3_100_002));

        let unknown = parse_table("Callsign,Name\nK1AB,Ann\n").unwrap();
        assert!(matches!(
            parse_filter_list(&unknown),
            Err(CodecError::UnrecognizedLayout(_))
        ));
    }
}
