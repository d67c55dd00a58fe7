//! Transformation module.
//!
//! This module turns adapter output into staging tables:
//! - Columns: canonical column names
//! - Repair: column-shifted row detection and field extraction
//! - Values / Dates: per-column value normalization
//! - Pipeline: per-source orchestration

pub mod columns;
pub mod dates;
pub mod pipeline;
pub mod repair;
pub mod values;

pub use columns::{normalize_column_name, normalize_column_names, normalize_table_columns};
pub use dates::{normalize_date, parse_date};
pub use pipeline::*;
pub use repair::{find_region_column, ExtractionRule, RepairReport, RowRepairer};
pub use values::{normalize_numeric_string, normalize_text, normalize_values, ColumnPolicy};
