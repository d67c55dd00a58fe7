//! Permissive, day-first date parsing.
//!
//! Accepts the shapes found in the exports (ISO dates, day-first numeric dates
//! with `-`, `/` or `.` separators, textual months, compact `YYYYMMDD`) and
//! renders them as `YYYY-MM-DD`. Anything else maps to `None`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Output format of every normalized date.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Two-digit years below this pivot land in the 2000s, the rest in the 1900s.
const TWO_DIGIT_YEAR_PIVOT: u32 = 70;

const NULL_MARKERS: [&str; 5] = ["", "nan", "none", "null", "nat"];

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]{1,4})[-/.]([0-9]{1,2})[-/.]([0-9]{1,4})(?:[ T][0-9]{1,2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]+)?)?Z?)?$",
    )
    .expect("valid numeric date pattern")
});

static COMPACT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})([0-9]{2})([0-9]{2})$").expect("valid compact date pattern")
});

static WEEKDAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").expect("valid weekday pattern")
});

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9])(?:st|nd|rd|th)\b").expect("valid ordinal pattern"));

static TEXT_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,./-]+").expect("valid separator pattern"));

static TEXTUAL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[a-z]+ [0-9]{1,2} [0-9]{4}|[0-9]{1,2} [a-z]+ [0-9]{4}|[0-9]{4} [a-z]+ [0-9]{1,2})$")
        .expect("valid textual date pattern")
});

const TEXTUAL_FORMATS: [&str; 3] = ["%B %d %Y", "%d %B %Y", "%Y %B %d"];

/// Parse a raw date cell. Underscores count as hyphens.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace('_', "-");
    let cleaned = cleaned.trim();

    if NULL_MARKERS.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE.captures(cleaned) {
        return resolve_numeric(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = COMPACT_DATE.captures(cleaned) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    parse_textual(cleaned)
}

/// Parse and render as `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format(ISO_DATE_FORMAT).to_string())
}

fn resolve_numeric(first: &str, second: &str, third: &str) -> Option<NaiveDate> {
    let a: u32 = first.parse().ok()?;
    let b: u32 = second.parse().ok()?;
    let c: u32 = third.parse().ok()?;

    if first.len() == 4 {
        let year = a as i32;
        return NaiveDate::from_ymd_opt(year, b, c).or_else(|| NaiveDate::from_ymd_opt(year, c, b));
    }
    if first.len() > 2 {
        return None;
    }

    let year = match third.len() {
        4 => c as i32,
        2 => expand_two_digit_year(c),
        _ => return None,
    };

    // Day first; month first only when the day-first reading is impossible.
    NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
}

fn expand_two_digit_year(yy: u32) -> i32 {
    if yy < TWO_DIGIT_YEAR_PIVOT {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

fn parse_textual(value: &str) -> Option<NaiveDate> {
    let value = WEEKDAY_PREFIX.replace(value, "");
    let value = ORDINAL_SUFFIX.replace_all(&value, "$1");
    let value = TEXT_SEPARATORS.replace_all(value.trim(), " ");
    let value = value.trim();

    if !TEXTUAL_DATE.is_match(value) {
        return None;
    }

    TEXTUAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize_date(s)
    }

    #[test]
    fn test_iso_dates() {
        assert_eq!(norm("2024-03-15").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("2024/03/15").as_deref(), Some("2024-03-15"));
        assert_eq!(norm(" 2024-03-04 ").as_deref(), Some("2024-03-04"));
    }

    #[test]
    fn test_underscore_separated() {
        assert_eq!(norm("15_03_2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("2024_03_15").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_day_first_precedence() {
        assert_eq!(norm("04/03/2024").as_deref(), Some("2024-03-04"));
        assert_eq!(norm("15.03.2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("1-2-2024").as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_month_first_fallback() {
        assert_eq!(norm("03/15/2024").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(norm("15/03/24").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("15/03/99").as_deref(), Some("1999-03-15"));
    }

    #[test]
    fn test_textual_months() {
        assert_eq!(norm("March 15 2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("march 5, 2024").as_deref(), Some("2024-03-05"));
        assert_eq!(norm("15 Mar 2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("15-Mar-2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("Friday, March 15th, 2024").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("2024 March 15").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_timestamps_keep_date_part() {
        assert_eq!(norm("2024-03-15 10:30:00").as_deref(), Some("2024-03-15"));
        assert_eq!(norm("2024-03-15T10:30:00Z").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_compact() {
        assert_eq!(norm("20240315").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(norm("not a date"), None);
        assert_eq!(norm("nan"), None);
        assert_eq!(norm(""), None);
        assert_eq!(norm("32/13/2024"), None);
        assert_eq!(norm("2024-02-30"), None);
        assert_eq!(norm("Smarch 15 2024"), None);
    }

    #[test]
    fn test_non_ascii_digits_are_unparseable() {
        assert_eq!(norm("२०२४०३१५"), None);
        assert_eq!(norm("१५/०३/२०२४"), None);
        assert_eq!(norm("March ١٥ 2024"), None);
        assert_eq!(norm("２０２４-０３-１５"), None);
    }

    #[test]
    fn test_canonical_is_fixed_point() {
        for raw in ["15_03_2024", "March 15 2024", "03/15/2024"] {
            let once = norm(raw).unwrap();
            assert_eq!(norm(&once).as_deref(), Some(once.as_str()));
        }
    }
}
