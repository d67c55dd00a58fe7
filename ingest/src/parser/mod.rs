//! Source adapters: raw bytes in, [`Table`] out.
//!
//! - [`delimited`] - CSV-like exports with encoding/delimiter detection and
//!   tolerance for malformed lines
//! - [`google`] - Nested Google Ads JSON feed, flattened to one row per daily metric
//!
//! Adapters never fail on a single bad row: short rows are padded, long rows
//! are dropped, and both are reported as [`MalformedRecord`]s.

pub mod delimited;
pub mod google;

use std::fmt;

use crate::models::Table;

pub use delimited::{
    decode_content, detect_delimiter, detect_encoding, read_delimited, DelimitedOptions,
};
pub use google::{read_google_feed, CAMPAIGN_FIELDS};

/// What the adapter did with a line of the wrong width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedAction {
    /// Missing trailing fields filled with null.
    Padded,
    /// Line discarded.
    Dropped,
}

/// A raw line whose field count did not match the expected columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// 1-based line number in the source.
    pub line: u64,
    pub expected: usize,
    pub found: usize,
    pub action: MalformedAction,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            MalformedAction::Padded => "padded",
            MalformedAction::Dropped => "dropped",
        };
        write!(
            f,
            "Line {}: expected {} fields, saw {} ({})",
            self.line, self.expected, self.found, action
        )
    }
}

/// Result of reading one source, with metadata.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    /// Parsed rows; for delimited sources the header columns come first,
    /// followed by any overflow columns.
    pub table: Table,
    /// Column names exactly as they appeared in the source header.
    pub raw_header: Vec<String>,
    /// Lines that were padded or dropped.
    pub malformed: Vec<MalformedRecord>,
    /// Rows that spilled into overflow columns.
    pub overflow_rows: usize,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Delimiter used, for delimited sources.
    pub delimiter: Option<char>,
}

impl ParsedSource {
    pub fn dropped_count(&self) -> usize {
        self.malformed
            .iter()
            .filter(|m| m.action == MalformedAction::Dropped)
            .count()
    }
}
