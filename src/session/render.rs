//! Plain-text presentation of normalized results, plus the tab-separated text
//! put on the clipboard.

use chrono::{Datelike, NaiveDate};

use crate::extraction::{Expense, Normalized, Receipt, UNKNOWN_VENDOR};

pub fn render(result: &Normalized) -> String {
    match result {
        Normalized::Expenses(expenses) => expense_table(expenses),
        Normalized::Receipt(receipt) => receipt_view(receipt),
    }
}

pub fn copy_text(result: &Normalized) -> String {
    match result {
        Normalized::Expenses(expenses) => expense_copy_text(expenses),
        Normalized::Receipt(receipt) => receipt_copy_text(receipt),
    }
}

/// en-US dollars: `$1,234.50`, `-$3.00`. Non-finite amounts render as `$0.00`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0.00".to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (digits, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn format_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

fn format_quantity(quantity: Option<f64>) -> String {
    let q = quantity.unwrap_or(1.0);
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{}", q)
    }
}

// a zero amount is as good as missing
fn expense_amount(expense: &Expense) -> String {
    if expense.expense_amount == 0.0 {
        "Unknown".to_string()
    } else {
        format_currency(expense.expense_amount)
    }
}

pub fn expense_table(expenses: &[Expense]) -> String {
    let mut table = TextTable::new(
        &["Date", "Vendor Name", "Category", "Expense Amount", "Description"],
        &[3],
    );
    for expense in expenses {
        table.row(vec![
            format_date(expense.date),
            expense.vendor_name.clone(),
            expense.category.clone().unwrap_or_default(),
            expense_amount(expense),
            expense.description.clone().unwrap_or_default(),
        ]);
    }

    let total: f64 = expenses.iter().map(|e| e.expense_amount).sum();
    table.footer(vec![
        "Total".to_string(),
        String::new(),
        String::new(),
        format_currency(total),
        String::new(),
    ]);
    table.render()
}

pub fn expense_copy_text(expenses: &[Expense]) -> String {
    expenses
        .iter()
        .map(|e| {
            [
                format_date(e.date),
                e.vendor_name.clone(),
                e.category.clone().unwrap_or_default(),
                expense_amount(e),
                e.description.clone().unwrap_or_default(),
            ]
            .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct ReceiptSummary {
    subtotal: f64,
    tax: f64,
    tip: Option<f64>,
    total: f64,
}

/// Falls back to figures computed from the items when the totals block is missing.
fn summarize(receipt: &Receipt) -> ReceiptSummary {
    let totals = receipt.totals.clone().unwrap_or_default();
    let subtotal = totals.subtotal.unwrap_or_else(|| receipt.items_subtotal());
    let tax = totals.tax.unwrap_or(0.0);
    let tip = totals.tip.filter(|t| *t != 0.0);
    let charges: f64 = receipt.additional_charges.iter().filter_map(|c| c.amount).sum();
    let total = totals
        .total
        .unwrap_or(subtotal + tax + tip.unwrap_or(0.0) + charges);

    ReceiptSummary {
        subtotal,
        tax,
        tip,
        total,
    }
}

fn vendor_name(receipt: &Receipt) -> &str {
    receipt
        .vendor_info
        .as_ref()
        .and_then(|v| v.name.as_deref())
        .unwrap_or(UNKNOWN_VENDOR)
}

pub fn receipt_view(receipt: &Receipt) -> String {
    let mut out = String::new();
    out.push_str(vendor_name(receipt));
    out.push('\n');
    if let Some(vendor) = &receipt.vendor_info {
        let when: Vec<&str> = [vendor.date.as_deref(), vendor.time.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !when.is_empty() {
            out.push_str(&when.join(" "));
            out.push('\n');
        }
        if let Some(location) = &vendor.location {
            out.push_str(location);
            out.push('\n');
        }
    }
    out.push('\n');

    let mut table = TextTable::new(&["Item", "Quantity", "Unit Price", "Subtotal"], &[1, 2, 3]);
    for item in &receipt.line_items {
        let name = match &item.notes {
            Some(notes) => format!("{} ({})", item.item_name, notes),
            None => item.item_name.clone(),
        };
        table.row(vec![
            name,
            format_quantity(item.quantity),
            format_currency(item.unit_price.unwrap_or(0.0)),
            format_currency(item.subtotal.unwrap_or(0.0)),
        ]);
    }

    let summary = summarize(receipt);
    let mut footer = |label: &str, amount: f64| {
        table.footer(vec![
            label.to_string(),
            String::new(),
            String::new(),
            format_currency(amount),
        ]);
    };
    footer("Subtotal", summary.subtotal);
    for charge in &receipt.additional_charges {
        footer(&charge.charge_name, charge.amount.unwrap_or(0.0));
    }
    footer("Tax", summary.tax);
    if let Some(tip) = summary.tip {
        footer("Tip", tip);
    }
    footer("Total", summary.total);

    out.push_str(&table.render());
    out
}

pub fn receipt_copy_text(receipt: &Receipt) -> String {
    let items = receipt
        .line_items
        .iter()
        .map(|item| {
            format!(
                "{}\t{}x\t{}\t{}",
                item.item_name,
                format_quantity(item.quantity),
                format_currency(item.unit_price.unwrap_or(0.0)),
                format_currency(item.subtotal.unwrap_or(0.0))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let date = receipt
        .vendor_info
        .as_ref()
        .and_then(|v| v.date.as_deref())
        .unwrap_or_default();
    let summary = summarize(receipt);

    let mut text = format!(
        "{}\n{}\n\nItems:\n{}\n\nSubtotal: {}\nTax: {}\n",
        vendor_name(receipt),
        date,
        items,
        format_currency(summary.subtotal),
        format_currency(summary.tax)
    );
    if let Some(tip) = summary.tip {
        text.push_str(&format!("Tip: {}\n", format_currency(tip)));
    }
    text.push_str(&format!("Total: {}", format_currency(summary.total)));
    text
}

/// Column-aligned table with a rule under the header and above the footer.
struct TextTable {
    headers: Vec<String>,
    right_aligned: Vec<usize>,
    rows: Vec<Vec<String>>,
    footers: Vec<Vec<String>>,
}

impl TextTable {
    fn new(headers: &[&str], right_aligned: &[usize]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            right_aligned: right_aligned.to_vec(),
            rows: Vec::new(),
            footers: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn footer(&mut self, cells: Vec<String>) {
        self.footers.push(cells);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for cells in self.rows.iter().chain(&self.footers) {
            for (i, cell) in cells.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut lines = vec![self.line(&self.headers, &widths), rule.clone()];
        lines.extend(self.rows.iter().map(|r| self.line(r, &widths)));
        if !self.footers.is_empty() {
            lines.push(rule);
            lines.extend(self.footers.iter().map(|r| self.line(r, &widths)));
        }
        lines.join("\n") + "\n"
    }

    fn line(&self, cells: &[String], widths: &[usize]) -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let pad = " ".repeat(width - cell.chars().count());
                if self.right_aligned.contains(&i) {
                    format!("{}{}", pad, cell)
                } else {
                    format!("{}{}", cell, pad)
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    }
}
