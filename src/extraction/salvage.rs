//! Best-effort recovery of receipt data from JSON the model did not finish,
//! typically because it ran into its token limit mid line item.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{Receipt, ReceiptItem, VendorInfo};

static VENDOR_INFO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""vendor_info"\s*:\s*(\{[^}]+\})"#).expect("valid vendor_info regex")
});

// Lazy body, stopping at the first `]` or at end of input when the array never closed.
static LINE_ITEMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"line_items"\s*:\s*\[(.*?)(?:\]|$)"#).expect("valid line_items regex")
});

static ITEM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*,?\s*").expect("valid item boundary regex"));

const REQUIRED_ITEM_KEYS: [&str; 3] = ["\"item_name\"", "\"subtotal\"", "\"unit_price\""];

/// `None` when neither the vendor block nor a single line item survived.
pub(crate) fn salvage_receipt(text: &str) -> Option<Receipt> {
    let vendor_info = salvage_vendor_info(text);
    let line_items = salvage_line_items(text);

    if vendor_info.is_none() && line_items.is_empty() {
        log::warn!("Nothing recoverable in truncated receipt");
        return None;
    }

    log::warn!(
        "Recovered partial receipt: vendor_info={}, line_items={}",
        vendor_info.is_some(),
        line_items.len()
    );
    Some(Receipt {
        vendor_info,
        line_items,
        ..Receipt::default()
    })
}

fn salvage_vendor_info(text: &str) -> Option<VendorInfo> {
    let block = VENDOR_INFO.captures(text)?.get(1)?.as_str();
    match serde_json::from_str(block) {
        Ok(vendor) => Some(vendor),
        Err(e) => {
            log::debug!("vendor_info block unparsable: {}", e);
            None
        }
    }
}

fn salvage_line_items(text: &str) -> Vec<ReceiptItem> {
    let Some(body) = LINE_ITEMS
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    ITEM_BOUNDARY
        .split(body)
        .filter(|fragment| REQUIRED_ITEM_KEYS.iter().all(|key| fragment.contains(key)))
        .filter_map(parse_item_fragment)
        .collect()
}

fn parse_item_fragment(fragment: &str) -> Option<ReceiptItem> {
    let fragment = fragment.trim();
    let closed = if fragment.ends_with('}') {
        fragment.to_string()
    } else {
        format!("{}}}", fragment)
    };

    let value: Value = match serde_json::from_str(&closed) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Dropping line item fragment ({}): {}", e, fragment);
            return None;
        }
    };
    if !value["item_name"].is_string() || !value["subtotal"].is_number() {
        log::debug!("Dropping mistyped line item: {}", fragment);
        return None;
    }

    serde_json::from_value(value).ok()
}
