//! Integration tests for outlay-core
//!
//! These tests exercise the full store → aggregate → project workflow.

use chrono::NaiveDate;

use outlay_core::{
    aggregate::{dashboard_summary, project_installments},
    dates::ParseDiagnostics,
    db::Database,
    import::ParsedPurchase,
    models::NewPurchase,
};

const USER: &str = "test@example.com";

fn new_purchase(
    category: &str,
    purchase_date: &str,
    merchant: &str,
    installments: &str,
    amount: f64,
) -> NewPurchase {
    NewPurchase {
        category: category.to_string(),
        purchase_date: purchase_date.to_string(),
        merchant: merchant.to_string(),
        location: String::new(),
        notes: String::new(),
        installments: installments.to_string(),
        amount,
        display_amount: None,
    }
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
}

// =============================================================================
// Store → Dashboard Integration Tests
// =============================================================================

#[test]
fn test_full_entry_to_dashboard_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    let entries = [
        new_purchase("Food", "05/01/2024", "Grocer", "1", 120.0),
        new_purchase("Food", "10/02/2024", "Bakery", "1", 80.0),
        new_purchase("Transport", "07/03/2024", "Metro", "1", 55.5),
        new_purchase("Leisure", "09/03/2024", "Cinema", "1", 44.5),
    ];
    for entry in &entries {
        entry.validate().expect("entry should validate");
        db.insert_purchase(USER, entry).expect("insert failed");
    }

    let records = db.list_purchases(USER).expect("list failed");
    assert_eq!(records.len(), 4);

    let summary = dashboard_summary(&records, reference_date());
    assert_eq!(summary.total_spend, 300.0);
    assert_eq!(summary.record_count, 4);
    assert_eq!(summary.distinct_months, 3);
    assert_eq!(summary.monthly_average, 100.0);
    // Reference date is in March: Metro + Cinema
    assert_eq!(summary.current_month_spend, 100.0);
    assert_eq!(summary.by_category.get("Food"), Some(&200.0));
    assert_eq!(summary.by_category.get("Transport"), Some(&55.5));
    assert_eq!(summary.date_fallbacks, 0);
    assert_eq!(summary.installment_fallbacks, 0);
}

#[test]
fn test_dashboard_counts_fallbacks_from_dirty_data() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    db.insert_purchase(USER, &new_purchase("Food", "not-a-date", "Grocer", "1", 10.0))
        .expect("insert failed");
    db.insert_purchase(USER, &new_purchase("Food", "05/01/2024", "Bakery", "soon", 20.0))
        .expect("insert failed");

    let records = db.list_purchases(USER).expect("list failed");
    let summary = dashboard_summary(&records, reference_date());

    // Bad date lands in the reference month; bad installments become 1
    assert_eq!(summary.date_fallbacks, 1);
    assert_eq!(summary.installment_fallbacks, 1);
    assert_eq!(summary.total_spend, 30.0);
}

#[test]
fn test_replace_snapshot_then_project() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    db.insert_purchase(USER, &new_purchase("Other", "01/01/2024", "Old", "1", 1.0))
        .expect("insert failed");

    // Wholesale replace with an installment purchase
    let mut snapshot = db.list_purchases(USER).expect("list failed");
    snapshot[0].purchase_date = "15/01/2024".to_string();
    snapshot[0].installments = "6x".to_string();
    snapshot[0].amount = 600.0;
    let replaced = db.replace_purchases(USER, snapshot).expect("replace failed");
    assert_eq!(replaced.len(), 1);
    assert!(replaced[0].id > 0, "replace assigns fresh ids");

    let records = db.list_purchases(USER).expect("list failed");
    let diag = ParseDiagnostics::default();
    let projections = project_installments(&records, reference_date(), &diag);

    // Bought January, reference March: 2 of 6 installments elapsed,
    // 4 remain at 100 each starting the month after the reference
    assert_eq!(projections.len(), 4);
    assert_eq!(projections[0].month, "April");
    assert_eq!(projections[0].amount, 100.0);
    assert_eq!(projections[3].month, "July");
}

#[test]
fn test_users_are_isolated() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    db.insert_purchase("a@example.com", &new_purchase("Food", "05/01/2024", "A", "1", 10.0))
        .expect("insert failed");
    db.insert_purchase("b@example.com", &new_purchase("Food", "05/01/2024", "B", "1", 20.0))
        .expect("insert failed");

    let a_records = db.list_purchases("a@example.com").expect("list failed");
    let b_records = db.list_purchases("b@example.com").expect("list failed");
    assert_eq!(a_records.len(), 1);
    assert_eq!(b_records.len(), 1);

    let a_summary = dashboard_summary(&a_records, reference_date());
    assert_eq!(a_summary.total_spend, 10.0);

    // Deleting across users must not touch the other snapshot
    assert!(db.delete_purchase("a@example.com", b_records[0].id).is_err());
    assert_eq!(db.count_purchases("b@example.com").unwrap(), 1);
}

// =============================================================================
// Parser Output → Store Integration Tests
// =============================================================================

#[test]
fn test_parsed_receipt_to_store_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    // What a parser-service response deserializes into
    let parsed = vec![
        ParsedPurchase {
            category: Some("Food".to_string()),
            purchase_date: Some("12/03/2024".to_string()),
            merchant: Some("Receipt Grocer".to_string()),
            amount: Some(33.0),
            ..Default::default()
        },
        // Sparse result: store applies the snapshot defaults
        ParsedPurchase {
            merchant: Some("Mystery Shop".to_string()),
            amount: Some(5.0),
            ..Default::default()
        },
    ];

    let today = reference_date();
    let records = db.insert_parsed(USER, parsed, today).expect("insert failed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].category, "Food");
    assert_eq!(records[1].category, "Other");
    assert_eq!(records[1].purchase_date, "15/03/2024");
    assert_eq!(records[1].installments, "1");

    let summary = dashboard_summary(&db.list_purchases(USER).unwrap(), today);
    assert_eq!(summary.total_spend, 38.0);
    assert_eq!(summary.record_count, 2);
}
