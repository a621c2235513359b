//! Domain models for outlay

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Category label applied when a record has none
pub const DEFAULT_CATEGORY: &str = "Other";

/// Categories offered by the manual-entry form
///
/// Advisory only: the store and the aggregation engine accept any free-text
/// label and compare labels exactly (case-sensitive).
pub const FORM_CATEGORIES: [&str; 6] = [
    "Food",
    "Transport",
    "Leisure",
    "Health",
    "Education",
    "Other",
];

/// Installment options offered by the manual-entry form (1..=12)
pub const MAX_FORM_INSTALLMENTS: u32 = 12;

/// A purchase record
///
/// `purchase_date` and `installments` keep the raw textual form the record
/// was supplied with; both are parsed leniently at aggregation time, never
/// at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Opaque identifier assigned by the store
    pub id: i64,
    /// Owning identity (email); every store operation is keyed by it
    pub user: String,
    pub category: String,
    /// Raw date text, `DD/MM/YYYY` or ISO `YYYY-MM-DD`
    pub purchase_date: String,
    pub merchant: String,
    pub location: String,
    pub notes: String,
    /// Raw installment count text, optionally suffixed with `x` (e.g. `"3x"`)
    pub installments: String,
    /// Value in the base currency unit
    pub amount: f64,
    /// Formatted amount for display; advisory only, never parsed back
    pub display_amount: String,
    /// Epoch milliseconds, used only for ordering and defaults
    pub created_at_millis: i64,
}

/// Input for the manual-entry flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    #[serde(default = "default_category")]
    pub category: String,
    pub purchase_date: String,
    pub merchant: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_installments")]
    pub installments: String,
    pub amount: f64,
    /// Preformatted display string; derived from `amount` when absent
    #[serde(default)]
    pub display_amount: Option<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_installments() -> String {
    "1".to_string()
}

impl NewPurchase {
    /// Form-level checks from the manual-entry flow: merchant present,
    /// amount positive, purchase date present
    pub fn validate(&self) -> Result<()> {
        if self.merchant.trim().is_empty() {
            return Err(Error::InvalidData("Merchant is required".to_string()));
        }
        if self.amount.is_nan() || self.amount <= 0.0 {
            return Err(Error::InvalidData(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if self.purchase_date.trim().is_empty() {
            return Err(Error::InvalidData(
                "Purchase date is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Apply the default when a category label is missing or blank
pub fn category_or_default(raw: &str) -> &str {
    if raw.trim().is_empty() {
        DEFAULT_CATEGORY
    } else {
        raw
    }
}

/// Format an amount for display: thousands-separated, two decimals
///
/// The result is advisory; nothing ever parses it back.
pub fn format_display_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if negative {
        format!("-{}.{:02}", grouped, frac)
    } else {
        format!("{}.{:02}", grouped, frac)
    }
}
