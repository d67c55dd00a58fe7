//! Per-column value normalization.
//!
//! Every column gets exactly one [`ColumnPolicy`], picked from its (already
//! canonical) name:
//!
//! | Policy          | Selected when              | Effect on non-null cells                          |
//! |-----------------|----------------------------|---------------------------------------------------|
//! | `Date`          | name contains `date`       | parse day-first, render `YYYY-MM-DD`, else null    |
//! | `NumericString` | name is `revenue`          | text only: lowercase, trim, drop all whitespace    |
//! | `Text`          | anything else              | text only: lowercase, trim, `&` → drop whitespace, |
//! |                 |                            | otherwise whitespace/hyphen runs → `_`             |
//!
//! Null cells always pass through, and numeric cells pass through every policy
//! except `Date`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dates::normalize_date;
use crate::models::{CellValue, Table};
use crate::vocabulary::{is_date_column, is_numeric_string_column};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("valid separator pattern"));

/// Normalization applied to every cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPolicy {
    Date,
    NumericString,
    Text,
}

impl ColumnPolicy {
    /// Pick the policy for a canonical column name.
    pub fn for_column(name: &str) -> Self {
        if is_date_column(name) {
            ColumnPolicy::Date
        } else if is_numeric_string_column(name) {
            ColumnPolicy::NumericString
        } else {
            ColumnPolicy::Text
        }
    }

    /// Apply this policy to one cell.
    pub fn apply(&self, value: &CellValue) -> CellValue {
        if value.is_null() {
            return CellValue::Null;
        }
        match self {
            ColumnPolicy::Date => self.apply_date(value),
            ColumnPolicy::NumericString => self.apply_numeric_string(value),
            ColumnPolicy::Text => self.apply_text(value),
        }
    }

    fn apply_date(&self, value: &CellValue) -> CellValue {
        value
            .to_string_form()
            .and_then(|s| normalize_date(&s))
            .map(CellValue::Text)
            .unwrap_or(CellValue::Null)
    }

    fn apply_numeric_string(&self, value: &CellValue) -> CellValue {
        match value.as_str() {
            Some(s) => CellValue::Text(normalize_numeric_string(s)),
            None => value.clone(),
        }
    }

    fn apply_text(&self, value: &CellValue) -> CellValue {
        match value.as_str() {
            Some(s) => CellValue::Text(normalize_text(s)),
            None => value.clone(),
        }
    }
}

/// Lowercase and trim, then either drop all whitespace (values containing `&`)
/// or collapse whitespace/hyphen runs into `_`.
pub fn normalize_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    let trimmed = lowered.trim();
    if trimmed.contains('&') {
        WHITESPACE.replace_all(trimmed, "").into_owned()
    } else {
        SEPARATOR_RUN.replace_all(trimmed, "_").into_owned()
    }
}

/// Lowercase, trim and remove every whitespace character.
pub fn normalize_numeric_string(value: &str) -> String {
    let lowered = value.to_lowercase();
    WHITESPACE.replace_all(lowered.trim(), "").into_owned()
}

/// Apply each column's policy to every cell, in place.
pub fn normalize_values(table: &mut Table) {
    let policies: Vec<ColumnPolicy> = table
        .columns()
        .iter()
        .map(|name| ColumnPolicy::for_column(name))
        .collect();

    for (idx, policy) in policies.into_iter().enumerate() {
        for cell in table.column_cells_mut(idx) {
            *cell = policy.apply(cell);
        }
    }
}
