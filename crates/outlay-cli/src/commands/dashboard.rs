//! Dashboard command implementation

use anyhow::{Context, Result};
use chrono::NaiveDate;
use outlay_core::dashboard_summary;
use outlay_core::dates::month_name;
use outlay_core::db::Database;

use super::truncate;

pub fn cmd_dashboard(db: &Database, user: &str, reference: Option<&str>) -> Result<()> {
    let reference = reference
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --reference date format (use YYYY-MM-DD)")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let purchases = db.list_purchases(user)?;
    let summary = dashboard_summary(&purchases, reference);

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│          💰 Outlay Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Reference date:  {}", reference);
    println!("  Purchases:       {}", summary.record_count);
    println!("  Total spend:     ${:.2}", summary.total_spend);
    println!(
        "  Monthly average: ${:.2} (over {} month{})",
        summary.monthly_average,
        summary.distinct_months,
        if summary.distinct_months == 1 { "" } else { "s" }
    );
    println!(
        "  This month:      ${:.2} ({:+.1}% vs average)",
        summary.current_month_spend, summary.change_vs_average_pct
    );

    if summary.record_count == 0 {
        println!();
        println!("  No purchases recorded. Add one with:");
        println!("    outlay add --merchant \"Corner Shop\" --date 15/03/2024 --amount 12.50");
        return Ok(());
    }

    println!();
    println!("  📂 By Category");
    println!("     {:20} │ {:>10}", "Category", "Amount");
    println!("     ─────────────────────┼────────────");
    for (category, amount) in &summary.by_category {
        println!("     {:20} │ {:>10.2}", truncate(category, 20), amount);
    }

    println!();
    println!("  📅 Spend by Month");
    println!("     {:12} │ {:>10}", "Month", "Amount");
    println!("     ─────────────┼────────────");
    for (index, amount) in summary.by_calendar_month.iter().enumerate() {
        if *amount > 0.0 {
            println!("     {:12} │ {:>10.2}", month_name(index), amount);
        }
    }

    if !summary.projections.is_empty() {
        println!();
        println!("  🔮 Upcoming Installments");
        println!("     {:12} │ {:>10}", "Month", "Due");
        println!("     ─────────────┼────────────");
        for projection in &summary.projections {
            println!(
                "     {:12} │ {:>10.2}",
                projection.month, projection.amount
            );
        }
    }

    if summary.date_fallbacks > 0 || summary.installment_fallbacks > 0 {
        println!();
        println!(
            "  ⚠️  Lenient parsing: {} date{} and {} installment count{} fell back to defaults",
            summary.date_fallbacks,
            if summary.date_fallbacks == 1 { "" } else { "s" },
            summary.installment_fallbacks,
            if summary.installment_fallbacks == 1 {
                ""
            } else {
                "s"
            }
        );
    }

    println!();
    Ok(())
}
