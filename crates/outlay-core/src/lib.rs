//! Outlay Core Library
//!
//! Shared functionality for the Outlay purchase tracker:
//! - Encrypted SQLite store for purchase snapshots
//! - Lenient date and installment parsing with fallback diagnostics
//! - Spend aggregation and installment projection engine
//! - Receipt upload validation and the HTTP parser client

pub mod aggregate;
pub mod dates;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

/// Test utilities including a canned receipt parser
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{dashboard_summary, DashboardSummary, MonthProjection};
pub use dates::ParseDiagnostics;
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use import::{HttpReceiptParser, ParsedPurchase, ReceiptParser, UploadFile};
pub use models::{NewPurchase, PurchaseRecord};
