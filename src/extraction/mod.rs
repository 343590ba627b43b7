//! Domain objects extracted from model output, and the normalizer that
//! produces them from raw completion text.

pub mod lenient;
mod normalizer;
mod salvage;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ai::Mode;

pub use normalizer::{normalize, normalize_at, UNKNOWN_VENDOR};

/// One transaction. Amounts are plain decimals, assumed USD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub vendor_name: String,
    pub expense_amount: f64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VendorInfo {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReceiptItem {
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdditionalCharge {
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub charge_name: String,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Totals {
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub tip: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub tip_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// An itemized receipt. Any part may be missing when the model output was
/// truncated and only partly recovered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub vendor_info: Option<VendorInfo>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub line_items: Vec<ReceiptItem>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub additional_charges: Vec<AdditionalCharge>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
}

impl Receipt {
    pub fn is_complete(&self) -> bool {
        self.vendor_info.is_some() && !self.line_items.is_empty() && self.totals.is_some()
    }

    /// Sum of item subtotals, used when the model dropped the totals block.
    pub fn items_subtotal(&self) -> f64 {
        self.line_items.iter().filter_map(|i| i.subtotal).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "data")]
pub enum Normalized {
    #[serde(rename = "expense")]
    Expenses(Vec<Expense>),
    #[serde(rename = "receipt")]
    Receipt(Receipt),
}

impl Normalized {
    pub fn mode(&self) -> Mode {
        match self {
            Normalized::Expenses(_) => Mode::Expense,
            Normalized::Receipt(_) => Mode::Receipt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn receipt_tolerates_quoted_and_null_values() {
        let receipt: Receipt = serde_json::from_value(json!({
            "vendor_info": { "name": "Diner", "location": null, "date": "2024-03-01" },
            "line_items": [
                { "item_name": "Pancakes", "quantity": "2", "unit_price": "4.50", "subtotal": "9.00" },
                "garbage"
            ],
            "additional_charges": null,
            "totals": { "subtotal": 9, "tax": "0.72", "tip": null, "total": 9.72 }
        }))
        .unwrap();

        assert_eq!(receipt.line_items.len(), 1);
        assert_eq!(receipt.line_items[0].quantity, Some(2.0));
        assert_eq!(receipt.line_items[0].subtotal, Some(9.0));
        assert!(receipt.additional_charges.is_empty());
        let totals = receipt.totals.as_ref().unwrap();
        assert_eq!(totals.tax, Some(0.72));
        assert_eq!(totals.tip, None);
        assert_eq!(receipt.vendor_info.as_ref().unwrap().location, None);
        assert!(receipt.is_complete());
        assert_eq!(receipt.items_subtotal(), 9.0);
    }

    #[test]
    fn receipt_drops_mistyped_sections() {
        let receipt: Receipt = serde_json::from_value(json!({
            "vendor_info": "Cafe",
            "line_items": [{ "item_name": "Tea", "subtotal": 3.5 }],
            "totals": "[Final Total]"
        }))
        .unwrap();

        assert_eq!(receipt.vendor_info, None);
        assert_eq!(receipt.totals, None);
        assert_eq!(receipt.line_items.len(), 1);
    }

    #[test]
    fn normalized_is_tagged_by_mode() {
        let value = serde_json::to_value(Normalized::Receipt(Receipt::default())).unwrap();
        assert_eq!(value["mode"], "receipt");
        assert_eq!(Normalized::Expenses(Vec::new()).mode(), Mode::Expense);
    }
}
