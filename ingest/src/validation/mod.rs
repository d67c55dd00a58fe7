//! JSON Schema validation for structured source feeds.
//!
//! The Google Ads export is checked against an embedded Draft 7 schema before
//! it is flattened, so shape problems surface as one readable error list
//! instead of a half-built table.
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `google-ads-feed.json`
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use stageload::validation::{is_valid_google_feed, validate_google_feed};
//!
//! let feed = json!({
//!     "campaigns": [
//!         { "campaign_name": "Brand", "daily_metrics": [{ "date": "2024-03-15" }] }
//!     ]
//! });
//! assert!(validate_google_feed(&feed).is_ok());
//! assert!(!is_valid_google_feed(&json!({ "campaigns": "nope" })));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static GOOGLE_FEED_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/google-ads-feed.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation otherwise
///
/// # Example
/// ```
/// use serde_json::json;
/// use stageload::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": {
///         "name": { "type": "string" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a Google Ads export against the embedded feed schema.
pub fn validate_google_feed(data: &Value) -> Result<(), Vec<String>> {
    validate(&GOOGLE_FEED_SCHEMA, data)
}

/// Quick check against the embedded feed schema.
pub fn is_valid_google_feed(data: &Value) -> bool {
    is_valid(&GOOGLE_FEED_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_feed() {
        let feed = json!({
            "campaigns": [
                {
                    "campaign_name": "Brand Search",
                    "campaign_id": 42,
                    "campaign_type": "SEARCH",
                    "daily_metrics": [
                        { "date": "2024-03-15", "clicks": 10, "cost": 12.5 }
                    ]
                }
            ]
        });
        assert!(validate_google_feed(&feed).is_ok());
        assert!(is_valid_google_feed(&feed));
    }

    #[test]
    fn test_empty_campaign_list_is_valid() {
        assert!(is_valid_google_feed(&json!({ "campaigns": [] })));
    }

    #[test]
    fn test_missing_campaigns() {
        let errors = validate_google_feed(&json!({ "data": [] })).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.contains("campaigns")));
    }

    #[test]
    fn test_missing_daily_metrics() {
        let feed = json!({ "campaigns": [{ "campaign_name": "x" }] });
        let errors = validate_google_feed(&feed).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("daily_metrics")));
    }

    #[test]
    fn test_metric_records_must_be_objects() {
        let feed = json!({ "campaigns": [{ "daily_metrics": [1, 2] }] });
        assert!(!is_valid_google_feed(&feed));
    }

    #[test]
    fn test_collects_every_violation() {
        let feed = json!({
            "campaigns": [
                { "daily_metrics": "not a list" },
                { "campaign_name": "ok" }
            ]
        });
        let errors = validate_google_feed(&feed).unwrap_err();
        assert!(errors.len() >= 2);
    }

    #[test]
    fn test_meta_fields_accept_any_scalar() {
        let feed = json!({
            "campaigns": [
                { "campaign_name": 2024, "campaign_id": 7.5, "campaign_type": true, "daily_metrics": [] }
            ]
        });
        assert!(is_valid_google_feed(&feed));
    }
}
