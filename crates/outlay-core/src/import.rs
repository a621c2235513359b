//! Receipt import collaborator
//!
//! Uploaded receipt files (images or PDFs) are turned into purchases by an
//! external parsing service. The service is opaque: this module validates
//! the files, ships them over HTTP, and maps whatever comes back onto the
//! record defaults. Any transport or decode failure becomes
//! [`Error::Import`]; callers surface a generic message and keep the cause
//! in the logs.

use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{NewPurchase, DEFAULT_CATEGORY};

/// Maximum size of one uploaded receipt file (5 MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Content types the import endpoint accepts
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "application/pdf",
];

const ALLOWED_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".pdf"];

/// One uploaded receipt file
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Check one upload against the size and type constraints
pub fn validate_upload(file: &UploadFile) -> Result<()> {
    if file.bytes.is_empty() {
        return Err(Error::InvalidData(format!("{}: empty file", file.filename)));
    }
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(Error::InvalidData(format!(
            "{}: exceeds the 5MB per-file limit",
            file.filename
        )));
    }
    if !is_allowed_type(&file.content_type, &file.filename) {
        return Err(Error::InvalidData(format!(
            "{}: only PNG, JPEG, and PDF files are accepted",
            file.filename
        )));
    }
    Ok(())
}

fn is_allowed_type(content_type: &str, filename: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ALLOWED_CONTENT_TYPES.contains(&ct.as_str()) {
        return true;
    }
    // Browsers sometimes send no useful type; fall back to the extension
    if ct.is_empty() || ct == "application/octet-stream" {
        let name = filename.to_ascii_lowercase();
        return ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
    }
    false
}

/// One purchase extracted by the parser service
///
/// Every field is optional; missing fields take the snapshot defaults when
/// the purchase is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedPurchase {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub installments: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub display_amount: Option<String>,
}

impl ParsedPurchase {
    /// Apply the snapshot defaults, producing a storable purchase:
    /// category "Other", date "today" as `DD/MM/YYYY`, one installment,
    /// amount 0
    pub fn into_new(self, today: NaiveDate) -> NewPurchase {
        NewPurchase {
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            purchase_date: self
                .purchase_date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| today.format("%d/%m/%Y").to_string()),
            merchant: self.merchant.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            installments: self
                .installments
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| "1".to_string()),
            amount: self.amount.unwrap_or(0.0),
            display_amount: self.display_amount,
        }
    }
}

/// Interface to the external receipt-parsing service
#[async_trait]
pub trait ReceiptParser: Send + Sync {
    /// Parse uploaded files into purchases for the given user
    async fn parse_files(&self, user: &str, files: &[UploadFile]) -> Result<Vec<ParsedPurchase>>;
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    user: &'a str,
    files: Vec<FilePayload>,
}

#[derive(Serialize)]
struct FilePayload {
    filename: String,
    content_type: String,
    /// Base64-encoded file bytes
    data: String,
}

#[derive(Deserialize)]
struct ParseResponse {
    purchases: Vec<ParsedPurchase>,
}

/// HTTP-backed receipt parser
pub struct HttpReceiptParser {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReceiptParser {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReceiptParser for HttpReceiptParser {
    async fn parse_files(&self, user: &str, files: &[UploadFile]) -> Result<Vec<ParsedPurchase>> {
        let payload = ParseRequest {
            user,
            files: files
                .iter()
                .map(|file| FilePayload {
                    filename: file.filename.clone(),
                    content_type: file.content_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&file.bytes),
                })
                .collect(),
        };

        debug!(
            endpoint = %self.endpoint,
            files = files.len(),
            "Sending receipts to the parser service"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Import(format!("Parser service unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Import(format!(
                "Parser service returned status {}",
                response.status()
            )));
        }

        let parsed: ParseResponse = response
            .json()
            .await
            .map_err(|e| Error::Import(format!("Unreadable parser response: {}", e)))?;

        Ok(parsed.purchases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(filename: &str, content_type: &str, len: usize) -> UploadFile {
        UploadFile {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn test_validate_upload_accepts_known_types() {
        assert!(validate_upload(&file("a.png", "image/png", 100)).is_ok());
        assert!(validate_upload(&file("b.jpg", "image/jpeg", 100)).is_ok());
        assert!(validate_upload(&file("c.pdf", "application/pdf", 100)).is_ok());
    }

    #[test]
    fn test_validate_upload_rejects_other_types() {
        assert!(validate_upload(&file("a.csv", "text/csv", 100)).is_err());
        assert!(validate_upload(&file("b.zip", "application/zip", 100)).is_err());
    }

    #[test]
    fn test_validate_upload_extension_fallback() {
        assert!(validate_upload(&file("receipt.PNG", "", 100)).is_ok());
        assert!(validate_upload(&file("receipt.pdf", "application/octet-stream", 100)).is_ok());
        assert!(validate_upload(&file("receipt.txt", "", 100)).is_err());
    }

    #[test]
    fn test_validate_upload_size_limit() {
        assert!(validate_upload(&file("a.png", "image/png", MAX_FILE_SIZE)).is_ok());
        assert!(validate_upload(&file("a.png", "image/png", MAX_FILE_SIZE + 1)).is_err());
        assert!(validate_upload(&file("a.png", "image/png", 0)).is_err());
    }

    #[test]
    fn test_parsed_purchase_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let new = ParsedPurchase::default().into_new(today);

        assert_eq!(new.category, "Other");
        assert_eq!(new.purchase_date, "15/06/2024");
        assert_eq!(new.installments, "1");
        assert_eq!(new.amount, 0.0);
        assert_eq!(new.merchant, "");
        assert_eq!(new.display_amount, None);
    }

    #[test]
    fn test_parsed_purchase_keeps_supplied_fields() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let parsed = ParsedPurchase {
            category: Some("Food".to_string()),
            purchase_date: Some("01/06/2024".to_string()),
            merchant: Some("Grocer".to_string()),
            installments: Some("3x".to_string()),
            amount: Some(90.0),
            display_amount: Some("90.00".to_string()),
            ..Default::default()
        };

        let new = parsed.into_new(today);
        assert_eq!(new.category, "Food");
        assert_eq!(new.purchase_date, "01/06/2024");
        assert_eq!(new.installments, "3x");
        assert_eq!(new.amount, 90.0);
        assert_eq!(new.display_amount, Some("90.00".to_string()));
    }

    #[test]
    fn test_parse_response_wire_format() {
        let parsed: ParseResponse = serde_json::from_str(
            r#"{"purchases": [{"merchant": "Grocer", "amount": 12.5, "purchase_date": "02/06/2024"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.purchases.len(), 1);
        assert_eq!(parsed.purchases[0].merchant.as_deref(), Some("Grocer"));
        assert_eq!(parsed.purchases[0].amount, Some(12.5));
        assert_eq!(parsed.purchases[0].category, None);
    }
}
