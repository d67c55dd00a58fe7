//! Column name canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TableResult;
use crate::models::Table;

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("valid separator pattern"));

/// Canonical form of a header: trimmed, lowercased, whitespace/hyphen runs
/// collapsed to a single underscore.
///
/// ```
/// use stageload::normalize_column_name;
///
/// assert_eq!(normalize_column_name("  Order Date "), "order_date");
/// assert_eq!(normalize_column_name("Campaign - Source"), "campaign_source");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    SEPARATOR_RUN.replace_all(&lowered, "_").into_owned()
}

/// Canonicalize a whole header, preserving length and order.
pub fn normalize_column_names(names: &[String]) -> Vec<String> {
    names.iter().map(|n| normalize_column_name(n)).collect()
}

/// Rename every column of `table` to its canonical form.
pub fn normalize_table_columns(table: &mut Table) -> TableResult<()> {
    let names = normalize_column_names(table.columns());
    table.rename_columns(names)
}
