//! Raw CSV tables and header resolution.
//!
//! Codecs never touch the csv crate directly: they read a `RawTable`, look
//! columns up through a `HeaderIndex` built from alias tables, and hand a
//! `RawTable` back for writing.

use std::collections::HashMap;
use std::io::{Read, Write};

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::Serialize;

use super::{CodecError, CodecResult};

/// Ordered header labels that name one canonical field.
pub type Aliases = &'static [&'static str];

/// A header row plus data rows, all as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Create an empty table with the given header row.
    #[must_use]
    pub fn with_headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header lookup for this table.
    #[must_use]
    pub fn index(&self) -> HeaderIndex {
        HeaderIndex::new(&self.headers)
    }
}

/// Case-insensitive header lookup.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

fn fold_header(label: &str) -> String {
    label.trim_start_matches('\u{feff}').trim().to_lowercase()
}

impl HeaderIndex {
    #[must_use]
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins for duplicated labels
            positions.entry(fold_header(header)).or_insert(i);
        }
        Self { positions }
    }

    /// Column position of the first alias present in the header.
    #[must_use]
    pub fn position(&self, aliases: Aliases) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.positions.get(&fold_header(alias)).copied())
    }

    /// Whether any alias is present.
    #[must_use]
    pub fn has(&self, aliases: Aliases) -> bool {
        self.position(aliases).is_some()
    }

    /// First non-empty trimmed value among the aliases.
    #[must_use]
    pub fn get<'r>(&self, row: &'r [String], aliases: Aliases) -> Option<&'r str> {
        aliases.iter().find_map(|alias| {
            let i = *self.positions.get(&fold_header(alias))?;
            let value = row.get(i)?.trim();
            (!value.is_empty()).then_some(value)
        })
    }

    /// Like `get`, returning an empty string when absent.
    #[must_use]
    pub fn text<'r>(&self, row: &'r [String], aliases: Aliases) -> &'r str {
        self.get(row, aliases).unwrap_or("")
    }

    /// Owned value, `None` when absent.
    #[must_use]
    pub fn owned(&self, row: &[String], aliases: Aliases) -> Option<String> {
        self.get(row, aliases).map(ToString::to_string)
    }
}

/// A row that could not be decoded. `row` is 1-based, excluding the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Decoded entities plus the rows that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Decoded<T> {
    /// Decode each row with `f`, collecting row errors instead of stopping.
    pub fn collect<F>(table: &RawTable, mut f: F) -> Self
    where
        F: FnMut(&HeaderIndex, &[String]) -> std::result::Result<Option<T>, String>,
    {
        let index = table.index();
        let mut decoded = Self::default();
        for (i, row) in table.rows.iter().enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            match f(&index, row) {
                Ok(Some(item)) => decoded.items.push(item),
                Ok(None) => {}
                Err(message) => {
                    tracing::debug!(row = i + 1, %message, "Row rejected");
                    decoded.reject(i + 1, message);
                }
            }
        }
        decoded
    }

    pub fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
    }
}

/// Output quoting convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// Quote only when needed, LF line endings
    #[default]
    Standard,
    /// Quote every field, CRLF line endings
    QuotedCrlf,
}

/// Read a CSV stream into a table.
///
/// Invalid UTF-8 is replaced rather than rejected; vendor tools are not
/// consistent about encodings.
///
/// # Errors
///
/// Returns `CodecError::MissingHeader` when the stream has no header row and
/// `CodecError::Csv` when the stream cannot be parsed.
pub fn read_table<R: Read>(reader: R) -> CodecResult<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| fold_header(h).is_empty()) {
        return Err(CodecError::MissingHeader);
    }

    let mut table = RawTable {
        headers,
        rows: Vec::new(),
    };
    for record in rdr.byte_records() {
        let record = record?;
        table.rows.push(
            record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect(),
        );
    }
    Ok(table)
}

/// Read a CSV held in memory.
///
/// # Errors
///
/// See [`read_table`].
pub fn parse_table(text: &str) -> CodecResult<RawTable> {
    read_table(text.as_bytes())
}

/// Write a table.
///
/// # Errors
///
/// Returns an error if the writer fails.
pub fn write_table<W: Write>(writer: W, table: &RawTable, style: TableStyle) -> CodecResult<()> {
    let (quote, terminator) = match style {
        TableStyle::Standard => (QuoteStyle::Necessary, Terminator::Any(b'\n')),
        TableStyle::QuotedCrlf => (QuoteStyle::Always, Terminator::CRLF),
    };
    let mut wtr = WriterBuilder::new()
        .quote_style(quote)
        .terminator(terminator)
        .flexible(false)
        .from_writer(writer);

    wtr.write_record(&table.headers)?;
    let width = table.headers.len();
    for row in &table.rows {
        if row.len() == width {
            wtr.write_record(row)?;
        } else {
            let mut padded = row.clone();
            padded.resize(width, String::new());
            wtr.write_record(&padded)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Render a table to a string.
///
/// # Errors
///
/// See [`write_table`].
pub fn render_table(table: &RawTable, style: TableStyle) -> CodecResult<String> {
    let mut buf = Vec::new();
    write_table(&mut buf, table, style)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: Aliases = &["CH Name", "Name"];

    #[test]
    fn test_header_index_is_case_insensitive() {
        let table = parse_table("\u{feff}name,Frequency\nRepeater,146.94\n").unwrap();
        let index = table.index();
        assert_eq!(index.get(&table.rows[0], NAME), Some("Repeater"));
        assert_eq!(index.position(&["FREQUENCY"]), Some(1));
        assert!(!index.has(&["Duplex"]));
    }

    #[test]
    fn test_first_non_empty_alias_wins() {
        let table = parse_table("CH Name,Name\n,Fallback\n").unwrap();
        assert_eq!(table.index().get(&table.rows[0], NAME), Some("Fallback"));
    }

    #[test]
    fn test_missing_header_is_malformed() {
        assert!(matches!(parse_table(""), Err(CodecError::MissingHeader)));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let table = parse_table("a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.index().get(&table.rows[0], &["c"]), None);
    }

    #[test]
    fn test_quoted_crlf_style() {
        let mut table = RawTable::with_headers(&["No.", "Name"]);
        table.push_row(vec!["1".to_string(), "Say \"hi\"".to_string()]);
        let out = render_table(&table, TableStyle::QuotedCrlf).unwrap();
        assert_eq!(out, "\"No.\",\"Name\"\r\n\"1\",\"Say \"\"hi\"\"\"\r\n");
    }

    #[test]
    fn test_standard_style_pads_rows() {
        let mut table = RawTable::with_headers(&["a", "b"]);
        table.rows.push(vec!["x".to_string()]);
        let out = render_table(&table, TableStyle::Standard).unwrap();
        assert_eq!(out, "a,b\nx,\n");
    }

    #[test]
    fn test_collect_skips_blank_rows_and_records_errors() {
        let table = parse_table("Name\nA\n\n,\nBAD\n").unwrap();
        let decoded = Decoded::collect(&table, |index, row| {
            let name = index.text(row, NAME);
            if name == "BAD" {
                Err("bad row".to_string())
            } else {
                Ok(Some(name.to_string()))
            }
        });
        assert_eq!(decoded.items, vec!["A".to_string()]);
        assert_eq!(decoded.errors.len(), 1);
    }
}
