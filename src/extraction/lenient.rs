//! Field decoders that accept what models actually emit: numbers as strings,
//! `null` for unknown values, and the odd wrongly typed entry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Leading decimal of `s`, the way JavaScript's `parseFloat` reads it.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float regex")
    });

    LEADING_FLOAT
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Money and quantity fields: `3.5`, `"3.50"`, `"$1,203.10"` or `null`.
pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

pub(crate) fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

pub(crate) fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(Option::unwrap_or_default)
}

/// Optional sub-objects such as `totals`: anything that is not a decodable object
/// reads as missing.
pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => match serde_json::from_value(value) {
            Ok(object) => Ok(Some(object)),
            Err(e) => {
                log::debug!("Dropping undecodable object: {}", e);
                Ok(None)
            }
        },
        Some(Value::Null) | None => Ok(None),
        Some(other) => {
            log::debug!("Expected an object, dropping {}", other);
            Ok(None)
        }
    }
}

/// `null` reads as empty, entries that do not decode are dropped.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                log::debug!("Dropping undecodable entry: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leading_float_matches_parse_float() {
        assert_eq!(parse_leading_float("12.50"), Some(12.5));
        assert_eq!(parse_leading_float("  7 USD"), Some(7.0));
        assert_eq!(parse_leading_float(".5"), Some(0.5));
        assert_eq!(parse_leading_float("-3.2e2 total"), Some(-320.0));
        assert_eq!(parse_leading_float("$12"), None);
        assert_eq!(parse_leading_float("abc"), None);
    }

    #[test]
    fn numbers_from_strings() {
        assert_eq!(number_from_value(&json!("3.50")), Some(3.5));
        assert_eq!(number_from_value(&json!("$1,203.10")), Some(1203.1));
        assert_eq!(number_from_value(&json!(2)), Some(2.0));
        assert_eq!(number_from_value(&json!("[Tip Amount if applicable]")), None);
        assert_eq!(number_from_value(&Value::Null), None);
    }

    #[test]
    fn text_skips_blank() {
        assert_eq!(text_from_value(&json!("  Cafe ")), Some("Cafe".to_string()));
        assert_eq!(text_from_value(&json!("")), None);
        assert_eq!(text_from_value(&json!(42)), Some("42".to_string()));
        assert_eq!(text_from_value(&json!({})), None);
    }
}
