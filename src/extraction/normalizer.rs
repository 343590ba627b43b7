use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::lenient::{parse_leading_float, text_from_value};
use super::{salvage, Expense, Normalized, Receipt};
use crate::ai::Mode;
use crate::error::NormalizationError;

pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

const EXPENSE_KEYS: [&str; 5] = [
    "vendor_name",
    "expense_amount",
    "date",
    "category",
    "description",
];

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*|\s*```").expect("valid fence regex"));

/// Turns a raw completion into the domain object for `mode`.
///
/// Expense dates the model left out default to today's local date.
pub fn normalize(raw: &str, mode: Mode) -> Result<Normalized, NormalizationError> {
    normalize_at(raw, mode, chrono::Local::now().date_naive())
}

pub fn normalize_at(
    raw: &str,
    mode: Mode,
    today: NaiveDate,
) -> Result<Normalized, NormalizationError> {
    if !raw.contains('{') {
        log::debug!("Completion holds no JSON object: {:.80}", raw);
        return Err(NormalizationError::NoStructuredData {
            raw: raw.to_string(),
        });
    }

    let unfenced = strip_fences(raw);
    let cleaned = json_body(&unfenced);
    log::debug!("Cleaned {} completion: {}", mode, cleaned);

    match mode {
        Mode::Receipt => normalize_receipt(cleaned, &unfenced).map(Normalized::Receipt),
        Mode::Expense => normalize_expenses(cleaned, today).map(Normalized::Expenses),
    }
}

/// Drops code fences and a BOM.
fn strip_fences(raw: &str) -> String {
    let text = raw.trim().trim_start_matches('\u{feff}');
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Slices off chatter before the first and after the last bracket.
fn json_body(text: &str) -> &str {
    let start = text.find(|c: char| c == '{' || c == '[').unwrap_or(0);
    let end = text
        .rfind(|c: char| c == '}' || c == ']')
        .map(|i| i + 1)
        .filter(|&end| end > start)
        .unwrap_or(text.len());
    &text[start..end]
}

/// Salvage reads `unfenced`, which still holds an item cut off before its `}`.
fn normalize_receipt(cleaned: &str, unfenced: &str) -> Result<Receipt, NormalizationError> {
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => receipt_from_value(value),
        Err(e) => {
            log::debug!("Receipt JSON incomplete ({}), attempting salvage", e);
            salvage::salvage_receipt(unfenced).ok_or_else(|| {
                NormalizationError::UnparsableStructuredData {
                    reason: e.to_string(),
                }
            })
        }
    }
}

fn receipt_from_value(value: Value) -> Result<Receipt, NormalizationError> {
    let mismatch = |detail: String| NormalizationError::SchemaMismatch {
        mode: Mode::Receipt,
        detail,
    };

    let value = match value {
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => items.remove(0),
        other => other,
    };
    let Some(object) = value.as_object() else {
        return Err(mismatch(format!("expected an object, got {}", kind_of(&value))));
    };

    let present = |key: &str| object.get(key).is_some_and(|v| !v.is_null());
    if !present("vendor_info") && !present("line_items") {
        return Err(mismatch("neither vendor_info nor line_items present".to_string()));
    }

    serde_json::from_value(value).map_err(|e| mismatch(e.to_string()))
}

fn normalize_expenses(cleaned: &str, today: NaiveDate) -> Result<Vec<Expense>, NormalizationError> {
    let wrapped;
    let body = if cleaned.starts_with('[') {
        cleaned
    } else {
        wrapped = format!("[{}]", cleaned);
        &wrapped
    };

    let value: Value = serde_json::from_str(body).map_err(|e| {
        log::debug!("Expense JSON unparsable: {}", e);
        NormalizationError::UnparsableStructuredData {
            reason: e.to_string(),
        }
    })?;

    let entries = match value {
        Value::Array(entries) => entries,
        other => vec![other],
    };

    let has_expense_key = |entry: &Value| {
        entry
            .as_object()
            .is_some_and(|object| EXPENSE_KEYS.iter().any(|key| object.contains_key(*key)))
    };
    if !entries.is_empty() && !entries.iter().any(has_expense_key) {
        return Err(NormalizationError::SchemaMismatch {
            mode: Mode::Expense,
            detail: format!("no entry has any of {}", EXPENSE_KEYS.join(", ")),
        });
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| expense_from_value(index, entry, today))
        .collect()
}

fn expense_from_value(
    index: usize,
    entry: &Value,
    today: NaiveDate,
) -> Result<Expense, NormalizationError> {
    let mismatch = |detail: String| NormalizationError::SchemaMismatch {
        mode: Mode::Expense,
        detail,
    };

    let Some(object) = entry.as_object() else {
        return Err(mismatch(format!("entry {} is {}", index, kind_of(entry))));
    };

    Ok(Expense {
        vendor_name: field_text(object, "vendor_name")
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
        expense_amount: object.get("expense_amount").map(amount).unwrap_or(0.0),
        date: object
            .get("date")
            .and_then(date_from_value)
            .unwrap_or(today),
        category: field_text(object, "category"),
        description: field_text(object, "description"),
    })
}

fn field_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(text_from_value)
}

fn amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_float(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        // epoch milliseconds
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<chrono::Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

// US month-first forms go before year-first ones: `%Y` also accepts two digits.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b. %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn expenses(raw: &str) -> Vec<Expense> {
        match normalize_at(raw, Mode::Expense, today()) {
            Ok(Normalized::Expenses(list)) => list,
            other => panic!("expected expenses, got {:?}", other),
        }
    }

    #[test]
    fn clean_strips_fences_and_chatter() {
        let clean = |raw: &str| json_body(&strip_fences(raw)).to_string();
        assert_eq!(clean("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(clean("```\n[1]\n```"), "[1]");
        assert_eq!(clean("Here you go:\n{\"a\":1}\nAnything else?"), "{\"a\":1}");
        assert_eq!(clean("\u{feff}{\"a\":1}"), "{\"a\":1}");
        assert_eq!(clean("{\"a\": [1, 2"), "{\"a\": [1, 2");
        assert_eq!(strip_fences("```json\n{\"a\": [{\"b\": 1"), "{\"a\": [{\"b\": 1");
    }

    #[test]
    fn expense_defaults() {
        let list = expenses(r#"{"vendor_name": "", "expense_amount": "n/a", "category": "  "}"#);
        assert_eq!(
            list,
            vec![Expense {
                vendor_name: UNKNOWN_VENDOR.to_string(),
                expense_amount: 0.0,
                date: today(),
                category: None,
                description: None,
            }]
        );
    }

    #[test]
    fn expense_amount_reads_leading_decimal() {
        let list = expenses(r#"{"vendor_name": "Venmo", "expense_amount": "23.40 USD"}"#);
        assert_eq!(list[0].expense_amount, 23.4);

        let list = expenses(r#"{"vendor_name": "Venmo", "expense_amount": 18}"#);
        assert_eq!(list[0].expense_amount, 18.0);
    }

    #[test]
    fn comma_separated_objects_become_a_list() {
        let list = expenses(
            "{\"vendor_name\": \"A\", \"expense_amount\": 1},\n{\"vendor_name\": \"B\", \"expense_amount\": 2}",
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].vendor_name, "B");
    }

    #[test]
    fn expense_dates() {
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_date("3/7/2024"), NaiveDate::from_ymd_opt(2024, 3, 7));
        assert_eq!(parse_date("03/07/24"), NaiveDate::from_ymd_opt(2024, 3, 7));
        assert_eq!(parse_date("March 7, 2024"), NaiveDate::from_ymd_opt(2024, 3, 7));
        assert_eq!(
            parse_date("2024-03-07T18:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
        assert_eq!(parse_date("[Date]"), None);

        let list = expenses(r#"{"vendor_name": "X", "date": "yesterday"}"#);
        assert_eq!(list[0].date, today());
    }

    #[test]
    fn expense_malformed_is_terminal() {
        let err = normalize_at(
            r#"[{"vendor_name": "A", "expense_amount": 1}, {"vendor_name": "B", "expen"#,
            Mode::Expense,
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizationError::UnparsableStructuredData { .. }));
    }

    #[test]
    fn receipt_in_expense_mode_is_a_mismatch() {
        let err = normalize_at(
            r#"{"vendor_info": {"name": "Cafe"}, "line_items": []}"#,
            Mode::Expense,
            today(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::SchemaMismatch { mode: Mode::Expense, .. }
        ));
    }

    #[test]
    fn expense_entry_without_keys_gets_defaults() {
        let list = expenses(r#"[{"vendor_name": "Lyft", "expense_amount": 18.2}, {}]"#);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].vendor_name, "Lyft");
        assert_eq!(list[1].vendor_name, UNKNOWN_VENDOR);
        assert_eq!(list[1].expense_amount, 0.0);
        assert_eq!(list[1].date, today());

        let err = normalize_at(r#"[{"vendor_name": "Lyft"}, 7]"#, Mode::Expense, today())
            .unwrap_err();
        assert!(matches!(err, NormalizationError::SchemaMismatch { .. }));
    }

    #[test]
    fn expense_in_receipt_mode_is_a_mismatch() {
        let err = normalize_at(
            r#"{"vendor_name": "Cafe", "expense_amount": 4}"#,
            Mode::Receipt,
            today(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::SchemaMismatch { mode: Mode::Receipt, .. }
        ));
    }

    #[test]
    fn receipt_with_null_sections_still_needs_a_key() {
        let err = normalize_at(
            r#"{"vendor_info": null, "line_items": null, "totals": {"total": 3}}"#,
            Mode::Receipt,
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, NormalizationError::SchemaMismatch { .. }));
    }

    #[test]
    fn receipt_wrapped_in_single_element_array() {
        let result = normalize_at(
            r#"[{"vendor_info": {"name": "Cafe"}, "line_items": []}]"#,
            Mode::Receipt,
            today(),
        )
        .unwrap();
        match result {
            Normalized::Receipt(receipt) => {
                assert_eq!(receipt.vendor_info.unwrap().name.as_deref(), Some("Cafe"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
