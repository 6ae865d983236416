//! Publication-year recovery from the many shapes sources use.

use chrono::{DateTime, Datelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static YEAR_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(19|20)\d{2}").expect("valid year regex"));

const YEAR_KEYS: &[&str] = &["year", "publication_year", "pub_year", "date", "published"];
const DATE_PARTS_KEYS: &[&str] = &["issued", "published-print", "published-online"];
const MILLIS_KEYS: &[&str] = &["cdate", "tcdate", "timestamp"];

/// Inclusive range of years considered plausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: 1900,
            max: 2099,
        }
    }
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    fn accept(&self, year: i64) -> Option<i32> {
        let year = i32::try_from(year).ok()?;
        (self.min..=self.max).contains(&year).then_some(year)
    }
}

/// First plausible four-digit year inside free text.
pub fn year_from_str(text: &str, range: YearRange) -> Option<i32> {
    let found = YEAR_IN_TEXT.find(text)?;
    found
        .as_str()
        .parse::<i64>()
        .ok()
        .and_then(|y| range.accept(y))
}

/// Year from a JSON value: integers, strings, objects with year-like keys,
/// CSL `date-parts`, millisecond timestamps, or the first element of a list.
pub fn year_from_value(value: &Value, range: YearRange) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| range.accept(y)),
        Value::String(s) => year_from_str(s, range),
        Value::Array(items) => items.first().and_then(|first| year_from_value(first, range)),
        Value::Object(map) => {
            if let Some(year) = YEAR_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|v| year_from_value(v, range))
            {
                return Some(year);
            }

            if let Some(year) = DATE_PARTS_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|v| year_from_date_parts(v, range))
            {
                return Some(year);
            }

            MILLIS_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|v| year_from_millis(v, range))
        }
        _ => None,
    }
}

/// `{"date-parts": [[2017, 6, 12]]}`
fn year_from_date_parts(value: &Value, range: YearRange) -> Option<i32> {
    let first = value.get("date-parts")?.as_array()?.first()?.as_array()?;
    first.first()?.as_i64().and_then(|y| range.accept(y))
}

fn year_from_millis(value: &Value, range: YearRange) -> Option<i32> {
    let millis = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    let when = DateTime::from_timestamp_millis(millis)?;
    range.accept(i64::from(when.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn year_from_free_text() {
        let r = YearRange::default();
        assert_eq!(year_from_str("2017", r), Some(2017));
        assert_eq!(year_from_str("Published June 1998, reprinted", r), Some(1998));
        assert_eq!(year_from_str("n.d.", r), None);
        assert_eq!(year_from_str("1850", r), None);
    }

    #[test]
    fn year_from_json_shapes() {
        let r = YearRange::default();
        assert_eq!(year_from_value(&json!(2020), r), Some(2020));
        assert_eq!(year_from_value(&json!(3020), r), None);
        assert_eq!(year_from_value(&json!({"publication_year": "2019"}), r), Some(2019));
        assert_eq!(
            year_from_value(&json!({"issued": {"date-parts": [[2017, 6, 12]]}}), r),
            Some(2017)
        );
        assert_eq!(year_from_value(&json!(["2004", "2010"]), r), Some(2004));
    }

    #[test]
    fn year_from_unix_millis() {
        let r = YearRange::default();
        // 2021-05-04T00:00:00Z
        assert_eq!(year_from_value(&json!({"cdate": 1_620_086_400_000_i64}), r), Some(2021));
        assert_eq!(year_from_value(&json!({"tcdate": 1.6200864e12}), r), Some(2021));
    }

    #[test]
    fn custom_range_is_respected() {
        let r = YearRange::new(2000, 2010);
        assert_eq!(year_from_str("1999", r), None);
        assert_eq!(year_from_value(&json!(2005), r), Some(2005));
    }
}
