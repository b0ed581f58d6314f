use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Decimals serialize as strings; compare numerically.
pub fn assert_decimal(value: &Value, field: &str, expected: i64) {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("Missing decimal field '{}' in {}", field, value));
    let actual = Decimal::from_str(raw).unwrap();
    assert_eq!(actual, Decimal::new(expected, 0), "Field '{}' mismatch", field);
}

pub fn assert_report_shape(report: &Value) {
    for field in ["period", "date_range", "settings", "summary", "rows", "insights", "warnings"] {
        assert!(report.get(field).is_some(), "Missing report field '{}'", field);
    }
    assert!(report.get("from_cache").and_then(|v| v.as_bool()).is_some());
    assert!(report.get("elapsed_ms").and_then(|v| v.as_u64()).is_some());
}

pub fn first_row(report: &Value) -> &Value {
    report
        .get("rows")
        .and_then(|rows| rows.as_array())
        .and_then(|rows| rows.first())
        .expect("Report has no rows")
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.to_string())
}
