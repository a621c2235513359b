//! Test utilities for outlay-core
//!
//! Record builders for the aggregation tests plus a stub receipt parser
//! that stands in for the external parsing service.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::import::{ParsedPurchase, ReceiptParser, UploadFile};
use crate::models::{format_display_amount, PurchaseRecord};

/// Build a purchase record with the fields the aggregation engine reads.
///
/// Merchant, location, and notes get placeholder values; `created_at_millis`
/// follows the id so insertion order and timestamp order agree.
pub fn sample_purchase(
    id: i64,
    category: &str,
    purchase_date: &str,
    installments: &str,
    amount: f64,
) -> PurchaseRecord {
    PurchaseRecord {
        id,
        user: "test@example.com".to_string(),
        category: category.to_string(),
        purchase_date: purchase_date.to_string(),
        merchant: format!("Merchant {}", id),
        location: "Testville".to_string(),
        notes: String::new(),
        installments: installments.to_string(),
        amount,
        display_amount: format_display_amount(amount),
        created_at_millis: 1_700_000_000_000 + id,
    }
}

/// Stub receipt parser returning canned purchases
///
/// Stands in for the external parsing service in handler and CLI tests.
/// Records nothing and never touches the network.
#[derive(Clone, Default)]
pub struct StubParser {
    /// Purchases returned from every `parse_files` call
    pub purchases: Vec<ParsedPurchase>,
    /// When set, `parse_files` fails with this message instead
    pub fail_with: Option<String>,
}

impl StubParser {
    /// Parser that yields one fully-populated purchase per call
    pub fn new() -> Self {
        Self {
            purchases: vec![ParsedPurchase {
                category: Some("Food".to_string()),
                purchase_date: Some("15/01/2024".to_string()),
                merchant: Some("Stub Grocer".to_string()),
                location: Some("Aisle 4".to_string()),
                notes: None,
                installments: Some("1".to_string()),
                amount: Some(42.5),
                display_amount: None,
            }],
            fail_with: None,
        }
    }

    /// Parser that yields the given purchases
    pub fn with_purchases(purchases: Vec<ParsedPurchase>) -> Self {
        Self {
            purchases,
            fail_with: None,
        }
    }

    /// Parser whose every call fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            purchases: vec![],
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ReceiptParser for StubParser {
    async fn parse_files(&self, _user: &str, _files: &[UploadFile]) -> Result<Vec<ParsedPurchase>> {
        if let Some(ref message) = self.fail_with {
            return Err(Error::Import(message.clone()));
        }
        Ok(self.purchases.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_parser_returns_canned_purchases() {
        let parser = StubParser::new();
        let parsed = parser.parse_files("test@example.com", &[]).await.unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].merchant.as_deref(), Some("Stub Grocer"));
    }

    #[tokio::test]
    async fn test_stub_parser_failing() {
        let parser = StubParser::failing("service offline");
        let err = parser
            .parse_files("test@example.com", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("service offline"));
    }

    #[test]
    fn test_sample_purchase_fields() {
        let record = sample_purchase(7, "Food", "01/02/2024", "3x", 99.5);
        assert_eq!(record.id, 7);
        assert_eq!(record.category, "Food");
        assert_eq!(record.installments, "3x");
        assert_eq!(record.display_amount, "99.50");
    }
}
