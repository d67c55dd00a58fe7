//! Fixed vocabulary shared by the repairer and the normalizers.

/// Canonical region labels, in their natural spelling.
pub const VALID_REGIONS: [&str; 6] = [
    "North America",
    "Europe",
    "Asia Pacific",
    "Africa",
    "South America",
    "Oceania",
];

/// Column holding the region label.
pub const REGION_COLUMN: &str = "region";

/// Identifier columns left out of the repair payload.
pub const IDENTIFIER_COLUMNS: [&str; 2] = ["order_id", "customer_id"];

/// Columns that carry numbers as strings.
pub const NUMERIC_STRING_COLUMNS: [&str; 1] = ["revenue"];

/// Substring marking a column as a date column.
pub const DATE_MARKER: &str = "date";

/// Fold a region value for membership checks: lowercase, each whitespace
/// character to an underscore.
pub fn fold_region(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// True when `value` names a canonical region, ignoring case and spacing.
pub fn is_valid_region(value: &str) -> bool {
    let folded = fold_region(value);
    VALID_REGIONS.iter().any(|r| fold_region(r) == folded)
}

pub fn is_identifier_column(name: &str) -> bool {
    IDENTIFIER_COLUMNS.contains(&name)
}

pub fn is_numeric_string_column(name: &str) -> bool {
    NUMERIC_STRING_COLUMNS.contains(&name)
}

pub fn is_date_column(name: &str) -> bool {
    name.contains(DATE_MARKER)
}
