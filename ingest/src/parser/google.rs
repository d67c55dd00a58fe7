//! Google Ads API feed adapter.
//!
//! The export nests one `daily_metrics` list per campaign. Each metric record
//! becomes a row; the campaign fields listed in [`CAMPAIGN_FIELDS`] are copied
//! onto every row of that campaign and placed after the record columns.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::ParsedSource;
use crate::error::{SourceError, SourceResult};
use crate::models::{CellValue, Table};
use crate::validation::validate_google_feed;

/// Campaign-level fields copied onto each metric row, in output order.
pub const CAMPAIGN_FIELDS: [&str; 3] = ["campaign_name", "campaign_id", "campaign_type"];

const RECORDS_KEY: &str = "daily_metrics";

/// Parse, validate and flatten a Google Ads feed.
pub fn read_google_feed(bytes: &[u8]) -> SourceResult<ParsedSource> {
    let decoded = String::from_utf8_lossy(bytes);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);
    if text.trim().is_empty() {
        return Err(SourceError::EmptyFile);
    }

    let feed: Value = serde_json::from_str(text)?;
    validate_google_feed(&feed).map_err(|errors| SourceError::FeedShape { errors })?;

    let campaigns = feed["campaigns"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    let mut record_columns: Vec<String> = Vec::new();
    let mut flat_rows: Vec<(Map<String, Value>, &Map<String, Value>)> = Vec::new();

    for (campaign_idx, campaign) in campaigns.iter().enumerate() {
        let Some(campaign) = campaign.as_object() else {
            continue;
        };

        for field in CAMPAIGN_FIELDS {
            if !campaign.contains_key(field) {
                warn!(campaign = campaign_idx, field, "campaign is missing a metadata field");
            }
        }

        let records = campaign
            .get(RECORDS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for record in records.iter().filter_map(Value::as_object) {
            let mut flat = Map::new();
            flatten_into(&mut flat, None, record);

            for key in flat.keys() {
                if CAMPAIGN_FIELDS.contains(&key.as_str()) {
                    return Err(SourceError::ConflictingField(key.clone()));
                }
                if !record_columns.contains(key) {
                    record_columns.push(key.clone());
                }
            }
            flat_rows.push((flat, campaign));
        }
    }

    debug!(
        campaigns = campaigns.len(),
        rows = flat_rows.len(),
        columns = record_columns.len(),
        "flattened google feed"
    );

    let mut columns = record_columns.clone();
    columns.extend(CAMPAIGN_FIELDS.iter().map(|f| f.to_string()));

    let mut table = Table::new(columns.clone());
    for (flat, campaign) in flat_rows {
        let mut row: Vec<CellValue> = record_columns
            .iter()
            .map(|col| flat.get(col).map(CellValue::from_json).unwrap_or_default())
            .collect();
        row.extend(
            CAMPAIGN_FIELDS
                .iter()
                .map(|f| campaign.get(*f).map(CellValue::from_json).unwrap_or_default()),
        );
        table.push_row(row)?;
    }

    Ok(ParsedSource {
        table,
        raw_header: columns,
        malformed: Vec::new(),
        overflow_rows: 0,
        encoding: "utf-8".to_string(),
        delimiter: None,
    })
}

/// Flatten nested objects into `parent.child` keys. Arrays and scalars are leaves.
fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(out, Some(&name), inner),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}
