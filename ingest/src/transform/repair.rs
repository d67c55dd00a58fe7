//! Column-shift repair for CRM rows.
//!
//! Unescaped delimiters in a raw CRM line push its fields to the right, so the
//! region column ends up holding a revenue figure, a date or a campaign tag.
//! A row is flagged when its region value is present but not a canonical
//! region label. For every flagged row the non-identifier cells are joined into
//! a payload, and the five shift-prone fields are re-extracted from it: the
//! first match of each rule wins, and a miss leaves the field null.
//!
//! ```text
//! order_id | order_date | revenue | ... | region        | overflow_1
//! 1001     | 2024-03-15 | Acme    | ... | 199.99        | Europe       <- flagged
//!
//! payload = "2024-03-15 Acme ... 199.99 Europe"
//!   order_date         <- 2024-03-15
//!   revenue            <- 199.99
//!   channel_attributed <- google | facebook
//!   campaign_source    <- goog_camp_N | fb_camp_N
//!   region             <- Europe
//! ```
//!
//! Rows with a null region are never flagged, even if other cells are shifted.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use super::columns::normalize_column_name;
use crate::models::{CellValue, Table};
use crate::vocabulary::{is_identifier_column, is_valid_region, REGION_COLUMN, VALID_REGIONS};

static REGION_PATTERN: Lazy<String> = Lazy::new(|| {
    let labels: Vec<String> = VALID_REGIONS.iter().map(|r| regex::escape(r)).collect();
    format!(r"(?i)(?:{})", labels.join("|"))
});

/// A field re-extracted from the payload of a flagged row.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    /// Canonical name of the target column.
    pub field: &'static str,
    pattern: Regex,
}

impl ExtractionRule {
    fn new(field: &'static str, pattern: &str) -> Self {
        Self {
            field,
            pattern: Regex::new(pattern).expect("valid extraction pattern"),
        }
    }

    /// First (leftmost) match in `payload`.
    pub fn extract<'p>(&self, payload: &'p str) -> Option<&'p str> {
        self.pattern
            .captures(payload)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str())
    }
}

/// Outcome of a repair pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    /// Indices of flagged rows, in row order.
    pub flagged_rows: Vec<usize>,
    /// Per field, how many flagged rows yielded no match.
    pub misses: BTreeMap<&'static str, usize>,
}

impl RepairReport {
    pub fn flagged_count(&self) -> usize {
        self.flagged_rows.len()
    }

    pub fn is_clean(&self) -> bool {
        self.flagged_rows.is_empty()
    }

    pub fn summary(&self) -> String {
        let misses: Vec<String> = self
            .misses
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(f, n)| format!("{}={}", f, n))
            .collect();
        if misses.is_empty() {
            format!("Repaired {} rows", self.flagged_rows.len())
        } else {
            format!(
                "Repaired {} rows (no match: {})",
                self.flagged_rows.len(),
                misses.join(", ")
            )
        }
    }
}

/// Detects column-shifted rows and rebuilds their fields.
///
/// The extraction rules are compiled once per repairer.
#[derive(Debug, Clone)]
pub struct RowRepairer {
    rules: Vec<ExtractionRule>,
}

impl Default for RowRepairer {
    fn default() -> Self {
        Self::new()
    }
}

impl RowRepairer {
    pub fn new() -> Self {
        let rules = vec![
            ExtractionRule::new(
                "order_date",
                r"([0-9]{4}[-/][0-9]{2}[-/][0-9]{2}|[a-zA-Z]+ [0-9]{1,2} [0-9]{4}|[0-9]{2}/[0-9]{2}/[0-9]{4})",
            ),
            ExtractionRule::new("revenue", r"([0-9]+\.[0-9]{2})\b"),
            ExtractionRule::new("channel_attributed", r"(?i)(google|facebook)"),
            ExtractionRule::new("campaign_source", r"((?:goog|fb)_camp_[0-9]+)"),
            ExtractionRule::new(REGION_COLUMN, &format!("({})", REGION_PATTERN.as_str())),
        ];
        Self { rules }
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Per-row flag: region present and not a canonical label.
    ///
    /// Empty when the table has no region column.
    pub fn repair_mask(&self, table: &Table) -> Vec<bool> {
        let Some(region_idx) = find_region_column(table) else {
            return Vec::new();
        };
        table
            .column_cells(region_idx)
            .map(|cell| match cell.to_string_form() {
                Some(value) => !is_valid_region(&value),
                None => false,
            })
            .collect()
    }

    /// Repair flagged rows in place. Unflagged rows are never touched.
    pub fn repair(&self, table: &mut Table) -> RepairReport {
        let mut report = RepairReport::default();

        let Some(region_idx) = find_region_column(table) else {
            tracing::debug!("no region column, repair skipped");
            return report;
        };

        let mask = self.repair_mask(table);
        report.flagged_rows = mask
            .iter()
            .enumerate()
            .filter_map(|(i, flagged)| flagged.then_some(i))
            .collect();

        if report.flagged_rows.is_empty() {
            return report;
        }

        let payload_columns: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_identifier_column(&normalize_column_name(name)))
            .map(|(i, _)| i)
            .collect();

        // Targets are resolved before the first write so appended columns
        // never leak into a payload.
        let targets: Vec<usize> = self
            .rules
            .iter()
            .map(|rule| {
                if rule.field == REGION_COLUMN {
                    region_idx
                } else {
                    resolve_target(table, rule.field)
                }
            })
            .collect();

        for &row in &report.flagged_rows {
            let payload = build_payload(table, row, &payload_columns);
            tracing::trace!(row, payload = %payload, "repairing shifted row");

            for (rule, &column) in self.rules.iter().zip(&targets) {
                let value = match rule.extract(&payload) {
                    Some(found) => CellValue::text(found),
                    None => {
                        *report.misses.entry(rule.field).or_insert(0) += 1;
                        CellValue::Null
                    }
                };
                table.set_cell(row, column, value);
            }
        }

        report
    }
}

/// `region` if present verbatim, else the first column whose canonical name is `region`.
pub fn find_region_column(table: &Table) -> Option<usize> {
    table.column_index(REGION_COLUMN).or_else(|| {
        table
            .columns()
            .iter()
            .position(|c| normalize_column_name(c) == REGION_COLUMN)
    })
}

fn resolve_target(table: &mut Table, field: &str) -> usize {
    table
        .column_index(field)
        .or_else(|| {
            table
                .columns()
                .iter()
                .position(|c| normalize_column_name(c) == field)
        })
        .unwrap_or_else(|| table.ensure_column(field))
}

/// Space-joined string forms of the given cells, null as empty.
fn build_payload(table: &Table, row: usize, columns: &[usize]) -> String {
    columns
        .iter()
        .map(|&col| table.cell(row, col).to_string_form().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn crm_columns() -> Vec<String> {
        [
            "order_id",
            "customer_id",
            "order_date",
            "revenue",
            "channel_attributed",
            "campaign_source",
            "region",
            "overflow_1",
            "overflow_2",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn clean_row() -> Vec<CellValue> {
        vec![
            CellValue::Int(1),
            CellValue::Int(10),
            text("2024-01-02"),
            text("50.00"),
            text("facebook"),
            text("fb_camp_7"),
            text("North America"),
            CellValue::Null,
            CellValue::Null,
        ]
    }

    fn shifted_row() -> Vec<CellValue> {
        vec![
            CellValue::Int(2),
            CellValue::Int(20),
            text("2024-03-15"),
            text("Acme"),
            text(" Widgets"),
            text("199.99"),
            text("XYZ"),
            text("google goog_camp_42"),
            text("Europe"),
        ]
    }

    #[test]
    fn test_mask_flags_only_invalid_non_null_regions() {
        let mut null_region = clean_row();
        null_region[6] = CellValue::Null;
        let mut lower_region = clean_row();
        lower_region[6] = text("asia pacific");

        let table = Table::from_rows(
            crm_columns(),
            vec![clean_row(), shifted_row(), null_region, lower_region],
        )
        .unwrap();

        let mask = RowRepairer::new().repair_mask(&table);
        assert_eq!(mask, vec![false, true, false, false]);
    }

    #[test]
    fn test_repair_rebuilds_shifted_row() {
        let mut table = Table::from_rows(crm_columns(), vec![clean_row(), shifted_row()]).unwrap();
        let report = RowRepairer::new().repair(&mut table);

        assert_eq!(report.flagged_rows, vec![1]);
        assert!(report.misses.is_empty());

        let row = &table.rows()[1];
        assert_eq!(row[2], text("2024-03-15"));
        assert_eq!(row[3], text("199.99"));
        assert_eq!(row[4], text("google"));
        assert_eq!(row[5], text("goog_camp_42"));
        assert_eq!(row[6], text("Europe"));
        assert_eq!(row[0], CellValue::Int(2));

        assert_eq!(table.rows()[0], clean_row());
    }

    #[test]
    fn test_clean_table_passes_through() {
        let mut table = Table::from_rows(crm_columns(), vec![clean_row()]).unwrap();
        let before = table.clone();
        let report = RowRepairer::new().repair(&mut table);
        assert!(report.is_clean());
        assert_eq!(table, before);
    }

    #[test]
    fn test_missing_pattern_yields_null() {
        let mut row = shifted_row();
        row[7] = text("no channel here");
        row[8] = text("Atlantis");
        let mut table = Table::from_rows(crm_columns(), vec![row]).unwrap();
        let report = RowRepairer::new().repair(&mut table);

        let row = &table.rows()[0];
        assert_eq!(row[4], CellValue::Null);
        assert_eq!(row[5], CellValue::Null);
        assert_eq!(row[6], CellValue::Null);
        assert_eq!(report.misses.get("channel_attributed"), Some(&1));
        assert_eq!(report.misses.get("region"), Some(&1));
    }

    #[test]
    fn test_first_match_wins() {
        let mut row = shifted_row();
        row[7] = text("facebook then google fb_camp_1 goog_camp_2");
        row[8] = text("Oceania Europe");
        let mut table = Table::from_rows(crm_columns(), vec![row]).unwrap();
        RowRepairer::new().repair(&mut table);

        let row = &table.rows()[0];
        assert_eq!(row[4], text("facebook"));
        assert_eq!(row[5], text("fb_camp_1"));
        assert_eq!(row[6], text("Oceania"));
    }

    #[test]
    fn test_identifiers_excluded_from_payload() {
        let columns: Vec<String> = ["order_id", "region", "revenue"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut table = Table::from_rows(
            columns,
            vec![vec![text("12.34"), text("bad"), CellValue::Null]],
        )
        .unwrap();
        RowRepairer::new().repair(&mut table);
        assert_eq!(table.cell(0, 2), &CellValue::Null);
        assert_eq!(table.cell(0, 0), &text("12.34"));
    }

    #[test]
    fn test_missing_targets_are_appended() {
        let columns: Vec<String> = ["Region", "notes"].iter().map(|s| s.to_string()).collect();
        let mut table = Table::from_rows(
            columns,
            vec![
                vec![text("99.50"), text("March 3 2024 via Facebook, Africa")],
                vec![text("Europe"), CellValue::Null],
            ],
        )
        .unwrap();
        RowRepairer::new().repair(&mut table);

        assert_eq!(
            table.columns(),
            &["Region", "notes", "order_date", "revenue", "channel_attributed", "campaign_source"]
        );
        assert_eq!(table.cell(0, 0), &text("Africa"));
        assert_eq!(table.cell(0, 2), &text("March 3 2024"));
        assert_eq!(table.cell(0, 3), &text("99.50"));
        assert_eq!(table.cell(0, 4), &text("Facebook"));
        assert_eq!(table.cell(0, 5), &CellValue::Null);
        assert_eq!(table.cell(1, 2), &CellValue::Null);
    }

    #[test]
    fn test_revenue_needs_exactly_two_decimals() {
        let rule = ExtractionRule::new("revenue", r"([0-9]+\.[0-9]{2})\b");
        assert_eq!(rule.extract("paid 1.234 then 15.50"), Some("15.50"));
        assert_eq!(rule.extract("paid 12.5"), None);
    }

    #[test]
    fn test_region_rule_matches_natural_spacing() {
        let repairer = RowRepairer::new();
        let rule = repairer.rules().iter().find(|r| r.field == "region").unwrap();
        assert_eq!(rule.extract("shipped to SOUTH AMERICA"), Some("SOUTH AMERICA"));
        assert_eq!(rule.extract("asia_pacific"), None);
    }

    #[test]
    fn test_no_region_column() {
        let mut table =
            Table::from_rows(vec!["a".into()], vec![vec![text("whatever")]]).unwrap();
        let report = RowRepairer::new().repair(&mut table);
        assert!(report.is_clean());
        assert!(RowRepairer::new().repair_mask(&table).is_empty());
    }
}
