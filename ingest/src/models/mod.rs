//! Domain models for the staging pipeline.
//!
//! - [`CellValue`] - Tagged scalar cell (text, integer, float or null)
//! - [`Table`] - Ordered columns plus ordered rows of cells
//!
//! Tables are created by a source adapter, mutated in place by the repairer and
//! the normalizers, and consumed by a sink. No operation reorders rows.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{TableError, TableResult};

// =============================================================================
// Cell Value
// =============================================================================

/// A single loosely-typed cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    #[default]
    Null,
}

impl CellValue {
    /// Build a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }

    /// Borrow the text of a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used for payloads, region checks and date parsing.
    ///
    /// Null has no string form. Floats always carry a fractional part
    /// (`200.0`), integers never do.
    pub fn to_string_form(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Convert a JSON scalar into a cell. Arrays and objects keep their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Text(b.to_string()),
            Value::Number(n) => n
                .as_i64()
                .map(CellValue::Int)
                .or_else(|| n.as_f64().map(CellValue::Float))
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{:.1}", v)
            }
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// Table
// =============================================================================

/// Ordered named columns and ordered rows.
///
/// Every row has exactly one cell per column and column names are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table. Duplicate names get `.N` suffixes.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: dedupe_names(columns),
            rows: Vec::new(),
        }
    }

    /// Create a table from columns and rows, checking row widths.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> TableResult<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> TableResult<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Resolve a column name to its index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        &self.rows[row][column]
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: CellValue) {
        self.rows[row][column] = value;
    }

    /// Mutable access to every cell of one column, in row order.
    pub fn column_cells_mut(&mut self, column: usize) -> impl Iterator<Item = &mut CellValue> {
        self.rows.iter_mut().map(move |row| &mut row[column])
    }

    /// Iterate the cells of one column, in row order.
    pub fn column_cells(&self, column: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().map(move |row| &row[column])
    }

    /// Index of `name`, appending a null-filled column if it does not exist.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Null);
        }
        self.columns.len() - 1
    }

    /// Replace every column name. Duplicates produced by the rename get `.N` suffixes.
    pub fn rename_columns(&mut self, names: Vec<String>) -> TableResult<()> {
        if names.len() != self.columns.len() {
            return Err(TableError::ColumnCount {
                expected: self.columns.len(),
                found: names.len(),
            });
        }
        self.columns = dedupe_names(names);
        Ok(())
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> TableResult<Table> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| TableError::ColumnNotFound(name.clone()))
            })
            .collect::<TableResult<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: dedupe_names(names.to_vec()),
            rows,
        })
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), cell.to_json()))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }
}

/// Suffix repeated names with `.1`, `.2`, ... keeping the first occurrence as is.
fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_string_form() {
        assert_eq!(CellValue::Int(42).to_string_form().as_deref(), Some("42"));
        assert_eq!(CellValue::Float(200.0).to_string_form().as_deref(), Some("200.0"));
        assert_eq!(CellValue::Float(199.99).to_string_form().as_deref(), Some("199.99"));
        assert_eq!(CellValue::text("Europe").to_string_form().as_deref(), Some("Europe"));
        assert_eq!(CellValue::Null.to_string_form(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(CellValue::from_json(&serde_json::json!(5)), CellValue::Int(5));
        assert_eq!(CellValue::from_json(&serde_json::json!(1.5)), CellValue::Float(1.5));
        assert_eq!(CellValue::from_json(&serde_json::json!(null)), CellValue::Null);
        assert_eq!(
            CellValue::from_json(&serde_json::json!([1, 2])),
            CellValue::text("[1,2]")
        );
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(cols(&["a", "b"]));
        assert!(table.push_row(vec![CellValue::Int(1)]).is_err());
        assert!(table.push_row(vec![CellValue::Int(1), CellValue::Null]).is_ok());
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_duplicate_columns_are_suffixed() {
        let table = Table::new(cols(&["id", "id", "name", "id"]));
        assert_eq!(table.columns(), &["id", "id.1", "name", "id.2"]);
    }

    #[test]
    fn test_ensure_column_appends_nulls() {
        let mut table = Table::from_rows(cols(&["a"]), vec![vec![CellValue::Int(1)]]).unwrap();
        let idx = table.ensure_column("b");
        assert_eq!(idx, 1);
        assert_eq!(table.cell(0, 1), &CellValue::Null);
        assert_eq!(table.ensure_column("a"), 0);
    }

    #[test]
    fn test_select_keeps_order_and_drops_rest() {
        let table = Table::from_rows(
            cols(&["a", "b", "overflow_1"]),
            vec![vec![CellValue::Int(1), CellValue::text("x"), CellValue::text("junk")]],
        )
        .unwrap();
        let selected = table.select(&cols(&["b", "a"])).unwrap();
        assert_eq!(selected.columns(), &["b", "a"]);
        assert_eq!(selected.rows()[0], vec![CellValue::text("x"), CellValue::Int(1)]);

        assert!(matches!(
            table.select(&cols(&["missing"])),
            Err(TableError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_to_records() {
        let table = Table::from_rows(
            cols(&["name", "clicks"]),
            vec![vec![CellValue::text("acme"), CellValue::Null]],
        )
        .unwrap();
        let records = table.to_records();
        assert_eq!(records[0]["name"], "acme");
        assert!(records[0]["clicks"].is_null());
    }
}
