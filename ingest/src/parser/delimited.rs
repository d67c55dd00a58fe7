//! Delimited text adapter with encoding and delimiter auto-detection.
//!
//! The column set is fixed up front: the raw header, followed by
//! `overflow_1..overflow_N` when overflow capture is enabled. A line with more
//! fields than the header spills into the overflow columns instead of being
//! misaligned; a line that does not fit even then is dropped.

use tracing::warn;

use super::{MalformedAction, MalformedRecord, ParsedSource};
use crate::error::{SourceError, SourceResult};
use crate::models::{CellValue, Table};

/// Prefix of the overflow column names.
pub const OVERFLOW_PREFIX: &str = "overflow_";

/// Cell contents read as null, matched exactly.
const NULL_TOKENS: [&str; 14] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "#NA",
    "<NA>",
];

/// Reader settings for one delimited source.
#[derive(Debug, Clone, Default)]
pub struct DelimitedOptions {
    /// Field delimiter; detected from the header line when `None`.
    pub delimiter: Option<u8>,
    /// Number of `overflow_N` columns appended after the header.
    pub overflow_columns: usize,
}

impl DelimitedOptions {
    pub fn with_overflow(overflow_columns: usize) -> Self {
        Self {
            delimiter: None,
            overflow_columns,
        }
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the given encoding. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Pick the delimiter that occurs most often in the first line; `,` when none does.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited bytes into a table.
///
/// # Example
/// ```
/// use stageload::parser::{read_delimited, DelimitedOptions};
///
/// let csv = "order_id,region\n1,Europe\n2,Europe,spill\n";
/// let parsed = read_delimited(csv.as_bytes(), &DelimitedOptions::with_overflow(1)).unwrap();
///
/// assert_eq!(parsed.table.columns(), &["order_id", "region", "overflow_1"]);
/// assert_eq!(parsed.table.row_count(), 2);
/// assert_eq!(parsed.overflow_rows, 1);
/// ```
pub fn read_delimited(bytes: &[u8], options: &DelimitedOptions) -> SourceResult<ParsedSource> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    if content.trim().is_empty() {
        return Err(SourceError::EmptyFile);
    }

    let delimiter = options
        .delimiter
        .map(char::from)
        .unwrap_or_else(|| detect_delimiter(&content));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let raw_header: Vec<String> = match records.next() {
        Some(header) => header?.iter().map(str::to_string).collect(),
        None => return Err(SourceError::EmptyFile),
    };
    if raw_header.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::NoHeaders);
    }

    let mut columns = raw_header.clone();
    columns.extend((1..=options.overflow_columns).map(|i| format!("{}{}", OVERFLOW_PREFIX, i)));
    let width = columns.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut malformed = Vec::new();
    let mut overflow_rows = 0;

    for record in records {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        if record.len() > width {
            warn!(line, expected = width, found = record.len(), "dropping malformed line");
            malformed.push(MalformedRecord {
                line,
                expected: width,
                found: record.len(),
                action: MalformedAction::Dropped,
            });
            continue;
        }

        if record.len() < raw_header.len() {
            warn!(line, expected = raw_header.len(), found = record.len(), "padding short line");
            malformed.push(MalformedRecord {
                line,
                expected: raw_header.len(),
                found: record.len(),
                action: MalformedAction::Padded,
            });
        } else if record.len() > raw_header.len() {
            overflow_rows += 1;
        }

        let mut row: Vec<Option<String>> = record.iter().map(parse_raw_cell).collect();
        row.resize(width, None);
        raw_rows.push(row);
    }

    let table = build_typed_table(columns, raw_rows)?;

    Ok(ParsedSource {
        table,
        raw_header,
        malformed,
        overflow_rows,
        encoding,
        delimiter: Some(delimiter),
    })
}

fn parse_raw_cell(raw: &str) -> Option<String> {
    if NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InferredType {
    Int,
    Float,
    Text,
}

/// A column is Int when every non-null cell parses as `i64`, Float when every
/// one parses as `f64`, Text otherwise.
fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Option<String>>) -> InferredType {
    let mut inferred = InferredType::Int;
    for cell in cells.flatten() {
        let value = cell.trim();
        match inferred {
            InferredType::Int if value.parse::<i64>().is_ok() => {}
            InferredType::Int | InferredType::Float if value.parse::<f64>().is_ok() => {
                inferred = InferredType::Float;
            }
            _ => return InferredType::Text,
        }
    }
    inferred
}

fn build_typed_table(columns: Vec<String>, raw_rows: Vec<Vec<Option<String>>>) -> SourceResult<Table> {
    let types: Vec<InferredType> = (0..columns.len())
        .map(|i| infer_column_type(raw_rows.iter().filter_map(|row| row.get(i))))
        .collect();

    let mut table = Table::new(columns);
    for raw in raw_rows {
        let row = raw
            .into_iter()
            .zip(&types)
            .map(|(cell, ty)| match (cell, ty) {
                (None, _) => CellValue::Null,
                (Some(s), InferredType::Int) => s
                    .trim()
                    .parse()
                    .map(CellValue::Int)
                    .unwrap_or(CellValue::Text(s)),
                (Some(s), InferredType::Float) => s
                    .trim()
                    .parse()
                    .map(CellValue::Float)
                    .unwrap_or(CellValue::Text(s)),
                (Some(s), InferredType::Text) => CellValue::Text(s),
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}
