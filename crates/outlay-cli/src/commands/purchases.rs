//! Purchase command implementations (list, add, delete, save)

use std::path::Path;

use anyhow::{Context, Result};
use outlay_core::dates::format_display_date;
use outlay_core::db::Database;
use outlay_core::models::{NewPurchase, PurchaseRecord};

use super::truncate;

pub fn cmd_list(db: &Database, user: &str) -> Result<()> {
    let purchases = db.list_purchases(user)?;

    if purchases.is_empty() {
        println!("No purchases found. Record one with:");
        println!("  outlay add --merchant \"Corner Shop\" --date 15/03/2024 --amount 12.50");
        return Ok(());
    }

    println!();
    println!("🧾 Purchases ({})", user);
    println!("   ─────────────────────────────────────────────────────────────");

    for p in purchases {
        println!(
            "   [{}] {} │ {:>10} │ {:>4} │ {:<10} │ {}",
            p.id,
            format_display_date(&p.purchase_date),
            p.display_amount,
            p.installments,
            truncate(&p.category, 10),
            truncate(&p.merchant, 30)
        );
    }

    println!();
    println!("   Use 'outlay delete <id>' to remove a purchase.");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &Database,
    user: &str,
    category: &str,
    date: &str,
    merchant: &str,
    location: &str,
    notes: &str,
    installments: &str,
    amount: f64,
) -> Result<()> {
    let new = NewPurchase {
        category: category.to_string(),
        purchase_date: date.to_string(),
        merchant: merchant.to_string(),
        location: location.to_string(),
        notes: notes.to_string(),
        installments: installments.to_string(),
        amount,
        display_amount: None,
    };
    new.validate()?;

    let record = db.insert_purchase(user, &new)?;
    db.log_audit(user, "create", Some("purchase"), Some(record.id), None)?;

    println!(
        "✅ Recorded [{}] {} │ {} │ {} ({} installment{})",
        record.id,
        record.purchase_date,
        record.display_amount,
        record.merchant,
        record.installments,
        if record.installments == "1" { "" } else { "s" }
    );

    Ok(())
}

pub fn cmd_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    db.delete_purchase(user, id)
        .with_context(|| format!("Failed to delete purchase {}", id))?;
    db.log_audit(user, "delete", Some("purchase"), Some(id), None)?;

    println!("✅ Deleted purchase {}", id);

    Ok(())
}

/// Replace the stored snapshot from a JSON array file
pub fn cmd_save(db: &Database, user: &str, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let records: Vec<PurchaseRecord> =
        serde_json::from_str(&contents).context("File must hold a JSON array of purchases")?;

    let count = records.len();
    let snapshot = db.replace_purchases(user, records)?;
    db.log_audit(
        user,
        "save_all",
        Some("purchase"),
        None,
        Some(&format!("count={}", count)),
    )?;

    println!("✅ Snapshot replaced: {} purchases stored", snapshot.len());

    Ok(())
}
