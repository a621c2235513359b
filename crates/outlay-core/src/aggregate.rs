//! Spend aggregation and installment projection
//!
//! Pure functions over a snapshot of purchase records plus a reference date.
//! Nothing here performs I/O or keeps state between calls; recomputation is
//! idempotent and callers replace previous results wholesale.
//!
//! Two quirks are deliberate and load-bearing for compatibility with the
//! data this dashboard has always shown:
//!
//! - Calendar-month bucketing is by month of year, not year-month pair.
//!   March 2023 and March 2024 share a bucket, in the totals and in the
//!   projection labels.
//! - Unparseable dates fall back to the reference "today" and unparseable
//!   installment counts fall back to 1, silently. [`ParseDiagnostics`]
//!   counts how often that happened.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates::{month_name, parse_installment_count, parse_purchase_date, ParseDiagnostics};
use crate::models::{category_or_default, PurchaseRecord};

/// One future month's projected installment obligation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthProjection {
    /// Calendar month name; different years fold into the same bucket
    pub month: String,
    pub amount: f64,
}

/// Everything the dashboard shows, computed in one pass over the snapshot
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_spend: f64,
    pub monthly_average: f64,
    /// Spend in the reference date's calendar-month bucket
    pub current_month_spend: f64,
    /// Total vs monthly average, in percent, one decimal; 0 when the
    /// average is 0
    pub change_vs_average_pct: f64,
    pub record_count: usize,
    /// Distinct purchase months (month-of-year), floored to 1
    pub distinct_months: u32,
    pub by_category: BTreeMap<String, f64>,
    /// January..December totals, folded across years
    pub by_calendar_month: [f64; 12],
    pub projections: Vec<MonthProjection>,
    /// Dates that silently fell back to the reference date
    pub date_fallbacks: u64,
    /// Installment counts that silently fell back to 1
    pub installment_fallbacks: u64,
}

/// Sum of `amount` across all records; empty input yields 0
pub fn total_spend(records: &[PurchaseRecord]) -> f64 {
    records.iter().map(|r| r.amount).sum()
}

/// Count of distinct calendar months among parsed purchase dates, floored
/// to 1 so it can serve as a divisor
///
/// Months are compared by month of year only: March 2023 and March 2024
/// count once.
pub fn distinct_months(
    records: &[PurchaseRecord],
    reference: NaiveDate,
    diag: &ParseDiagnostics,
) -> u32 {
    let mut seen = [false; 12];
    for record in records {
        let date = parse_purchase_date(&record.purchase_date, reference, diag);
        seen[date.month0() as usize] = true;
    }
    let count = seen.iter().filter(|m| **m).count() as u32;
    count.max(1)
}

/// Total spend divided by the distinct purchase-month count
pub fn monthly_average(
    records: &[PurchaseRecord],
    reference: NaiveDate,
    diag: &ParseDiagnostics,
) -> f64 {
    total_spend(records) / f64::from(distinct_months(records, reference, diag))
}

/// Spend per category label
///
/// Labels match exactly (case-sensitive, no normalization); blank labels
/// fall under the default category.
pub fn spend_by_category(records: &[PurchaseRecord]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        let label = category_or_default(&record.category);
        *totals.entry(label.to_string()).or_insert(0.0) += record.amount;
    }
    totals
}

/// January..December totals, aggregated across every year present
pub fn spend_by_calendar_month(
    records: &[PurchaseRecord],
    reference: NaiveDate,
    diag: &ParseDiagnostics,
) -> [f64; 12] {
    let mut totals = [0.0; 12];
    for record in records {
        let date = parse_purchase_date(&record.purchase_date, reference, diag);
        totals[date.month0() as usize] += record.amount;
    }
    totals
}

/// Forward-looking installment obligations, bucketed by future month name
///
/// For each record: per-installment amount is `amount / count`; the months
/// already elapsed since purchase (in whole calendar months, by year and
/// month component only) reduce the remaining count; what remains is
/// allocated to the months after the reference date, one installment per
/// month. Buckets appear in chronological first-use order starting with the
/// month after the reference date.
pub fn project_installments(
    records: &[PurchaseRecord],
    reference: NaiveDate,
    diag: &ParseDiagnostics,
) -> Vec<MonthProjection> {
    let purchased: Vec<NaiveDate> = records
        .iter()
        .map(|r| parse_purchase_date(&r.purchase_date, reference, diag))
        .collect();
    project_with_dates(records, &purchased, reference, diag)
}

/// Projection over already-parsed purchase dates
fn project_with_dates(
    records: &[PurchaseRecord],
    purchased: &[NaiveDate],
    reference: NaiveDate,
    diag: &ParseDiagnostics,
) -> Vec<MonthProjection> {
    let mut order: Vec<&'static str> = Vec::new();
    let mut totals: HashMap<&'static str, f64> = HashMap::new();

    for (record, date) in records.iter().zip(purchased) {
        let count = parse_installment_count(&record.installments, diag);
        let per_installment = record.amount / f64::from(count);

        // Whole calendar months between purchase and reference; negative for
        // future-dated purchases, which extends the remaining horizon
        let months_elapsed = (reference.year() - date.year()) * 12
            + (reference.month() as i32 - date.month() as i32);
        let remaining = i64::from(count) - i64::from(months_elapsed);
        if remaining <= 0 {
            continue;
        }

        // Offsets 13, 25, ... land on the same month names as 1..=12, so
        // whole 12-month cycles fold into each bucket arithmetically instead
        // of walking the full horizon.
        let full_cycles = remaining / 12;
        let extra = remaining % 12;
        for offset in 1..=remaining.min(12) {
            let name = month_name(reference.month0() as usize + offset as usize);
            if !totals.contains_key(name) {
                order.push(name);
            }
            let repeats = full_cycles + i64::from(offset <= extra);
            *totals.entry(name).or_insert(0.0) += per_installment * repeats as f64;
        }
    }

    order
        .into_iter()
        .map(|month| MonthProjection {
            amount: totals.remove(month).unwrap_or(0.0),
            month: month.to_string(),
        })
        .collect()
}

/// Compute the full dashboard payload over one snapshot
///
/// Each record's date is parsed exactly once, so the fallback counters in
/// the result count defaulted records, not parse attempts.
pub fn dashboard_summary(records: &[PurchaseRecord], reference: NaiveDate) -> DashboardSummary {
    let diag = ParseDiagnostics::default();

    let purchased: Vec<NaiveDate> = records
        .iter()
        .map(|r| parse_purchase_date(&r.purchase_date, reference, &diag))
        .collect();

    let mut seen = [false; 12];
    let mut by_calendar_month = [0.0; 12];
    for (record, date) in records.iter().zip(&purchased) {
        let idx = date.month0() as usize;
        seen[idx] = true;
        by_calendar_month[idx] += record.amount;
    }
    let distinct = (seen.iter().filter(|m| **m).count() as u32).max(1);

    let total = total_spend(records);
    let average = total / f64::from(distinct);
    let change_vs_average_pct = if average > 0.0 {
        ((total - average) / average * 1000.0).round() / 10.0
    } else {
        0.0
    };

    let projections = project_with_dates(records, &purchased, reference, &diag);

    DashboardSummary {
        total_spend: total,
        monthly_average: average,
        current_month_spend: by_calendar_month[reference.month0() as usize],
        change_vs_average_pct,
        record_count: records.len(),
        distinct_months: distinct,
        by_category: spend_by_category(records),
        by_calendar_month,
        projections,
        date_fallbacks: diag.date_fallbacks(),
        installment_fallbacks: diag.installment_fallbacks(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_purchase;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_total_spend_is_order_independent() {
        let a = sample_purchase(1, "Food", "01/01/2024", "1", 10.0);
        let b = sample_purchase(2, "Transport", "15/02/2024", "1", 20.5);
        let c = sample_purchase(3, "Leisure", "20/03/2024", "1", 0.5);

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let backward = vec![c, b, a];

        assert_eq!(total_spend(&forward), 31.0);
        assert_eq!(total_spend(&forward), total_spend(&backward));
        assert_eq!(total_spend(&[]), 0.0);
    }

    #[test]
    fn test_monthly_average_times_months_equals_total() {
        let records = vec![
            sample_purchase(1, "Food", "05/01/2024", "1", 120.0),
            sample_purchase(2, "Food", "10/01/2024", "1", 80.0),
            sample_purchase(3, "Transport", "07/03/2024", "1", 55.5),
            // Same month of a different year folds into March
            sample_purchase(4, "Leisure", "09/03/2023", "1", 44.5),
        ];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        let months = distinct_months(&records, reference, &diag);
        assert_eq!(months, 2);

        let diag = ParseDiagnostics::default();
        let average = monthly_average(&records, reference, &diag);
        assert!((average * f64::from(months) - total_spend(&records)).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_average_of_empty_is_zero() {
        let diag = ParseDiagnostics::default();
        let average = monthly_average(&[], date(2024, 6, 15), &diag);
        assert_eq!(average, 0.0);
    }

    #[test]
    fn test_spend_by_category_sums_to_total() {
        let records = vec![
            sample_purchase(1, "Food", "05/01/2024", "1", 10.0),
            sample_purchase(2, "food", "06/01/2024", "1", 20.0),
            sample_purchase(3, "", "07/01/2024", "1", 5.0),
            sample_purchase(4, "Food", "08/01/2024", "1", 2.5),
        ];

        let by_category = spend_by_category(&records);
        // Case-sensitive: "Food" and "food" are distinct labels
        assert_eq!(by_category["Food"], 12.5);
        assert_eq!(by_category["food"], 20.0);
        // Blank labels fall under the default
        assert_eq!(by_category["Other"], 5.0);

        let sum: f64 = by_category.values().sum();
        assert!((sum - total_spend(&records)).abs() < 1e-9);
    }

    #[test]
    fn test_spend_by_calendar_month_folds_years() {
        let records = vec![
            sample_purchase(1, "Food", "05/03/2023", "1", 10.0),
            sample_purchase(2, "Food", "05/03/2024", "1", 30.0),
            sample_purchase(3, "Food", "05/11/2024", "1", 7.0),
        ];
        let diag = ParseDiagnostics::default();
        let totals = spend_by_calendar_month(&records, date(2024, 6, 15), &diag);

        assert_eq!(totals[2], 40.0); // both Marches
        assert_eq!(totals[10], 7.0);
        assert_eq!(totals.iter().filter(|t| **t != 0.0).count(), 2);
    }

    #[test]
    fn test_projection_spreads_remaining_installments() {
        // 1200 over 12 installments, purchased 3 months before the reference:
        // 9 future months get 100 each, starting the month after the reference
        let records = vec![sample_purchase(1, "Other", "15/03/2024", "12", 1200.0)];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        let projections = project_installments(&records, reference, &diag);
        assert_eq!(projections.len(), 9);

        let expected_months = [
            "July", "August", "September", "October", "November", "December", "January",
            "February", "March",
        ];
        for (projection, expected) in projections.iter().zip(expected_months) {
            assert_eq!(projection.month, expected);
            assert!((projection.amount - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_projection_accepts_x_suffix() {
        let records = vec![sample_purchase(1, "Other", "15/05/2024", "3x", 300.0)];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        let projections = project_installments(&records, reference, &diag);
        // One month elapsed, two installments left
        assert_eq!(projections.len(), 2);
        assert_eq!(projections[0].month, "July");
        assert!((projections[0].amount - 100.0).abs() < 1e-9);
        assert_eq!(projections[1].month, "August");
        assert_eq!(diag.installment_fallbacks(), 0);
    }

    #[test]
    fn test_unparseable_count_projects_one_installment() {
        let reference = date(2024, 6, 15);

        // Purchased within the reference month: months_elapsed = 0 < 1, so the
        // full amount lands on the immediate next month
        let records = vec![sample_purchase(1, "Other", "02/06/2024", "soon", 500.0)];
        let diag = ParseDiagnostics::default();
        let projections = project_installments(&records, reference, &diag);
        assert_eq!(projections.len(), 1);
        assert_eq!(projections[0].month, "July");
        assert!((projections[0].amount - 500.0).abs() < 1e-9);
        assert_eq!(diag.installment_fallbacks(), 1);

        // Purchased a month earlier: months_elapsed = 1, nothing remains
        let records = vec![sample_purchase(1, "Other", "02/05/2024", "", 500.0)];
        let diag = ParseDiagnostics::default();
        let projections = project_installments(&records, reference, &diag);
        assert!(projections.is_empty());
    }

    #[test]
    fn test_projection_folds_long_horizons() {
        // 25 installments starting now: offsets 1, 13, and 25 share the July
        // bucket, so it carries three installments
        let records = vec![sample_purchase(1, "Other", "15/06/2024", "25", 250.0)];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        let projections = project_installments(&records, reference, &diag);
        assert_eq!(projections.len(), 12);
        assert_eq!(projections[0].month, "July");
        assert!((projections[0].amount - 30.0).abs() < 1e-9); // 3 * 10
        assert!((projections[1].amount - 20.0).abs() < 1e-9); // 2 * 10

        let sum: f64 = projections.iter().map(|p| p.amount).sum();
        assert!((sum - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_of_future_dated_purchase() {
        // Purchased after the reference date: months_elapsed is negative and
        // the formula extends the horizon instead of clamping
        let records = vec![sample_purchase(1, "Other", "15/08/2024", "2", 100.0)];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        let projections = project_installments(&records, reference, &diag);
        let sum: f64 = projections.iter().map(|p| p.amount).sum();
        // remaining = 2 - (-2) = 4 installments of 50
        assert_eq!(projections.len(), 4);
        assert!((sum - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_date_falls_back_deterministically() {
        let records = vec![sample_purchase(1, "Other", "31/02/2024", "1", 80.0)];
        let reference = date(2024, 6, 15);
        let diag = ParseDiagnostics::default();

        // Must not panic; the record lands in the reference month's bucket
        let totals = spend_by_calendar_month(&records, reference, &diag);
        assert_eq!(totals[5], 80.0);
        assert_eq!(diag.date_fallbacks(), 1);
    }

    #[test]
    fn test_dashboard_summary() {
        let records = vec![
            sample_purchase(1, "Food", "05/05/2024", "1", 100.0),
            sample_purchase(2, "Transport", "10/06/2024", "1", 50.0),
            sample_purchase(3, "Food", "12/06/2024", "2x", 150.0),
        ];
        let reference = date(2024, 6, 15);

        let summary = dashboard_summary(&records, reference);
        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.total_spend, 300.0);
        assert_eq!(summary.distinct_months, 2);
        assert_eq!(summary.monthly_average, 150.0);
        assert_eq!(summary.current_month_spend, 200.0);
        // (300 - 150) / 150 = +100.0%
        assert_eq!(summary.change_vs_average_pct, 100.0);
        assert_eq!(summary.by_category["Food"], 250.0);
        assert_eq!(summary.by_calendar_month[4], 100.0);
        // Record 2 owes its single installment next month (50); record 3 owes
        // 75 in each of the next two months
        assert_eq!(summary.projections.len(), 2);
        assert_eq!(summary.projections[0].month, "July");
        assert!((summary.projections[0].amount - 125.0).abs() < 1e-9);
        assert_eq!(summary.projections[1].month, "August");
        assert!((summary.projections[1].amount - 75.0).abs() < 1e-9);
        assert_eq!(summary.date_fallbacks, 0);
        assert_eq!(summary.installment_fallbacks, 0);
    }

    #[test]
    fn test_dashboard_summary_counts_fallbacks_once_per_record() {
        let records = vec![
            sample_purchase(1, "Food", "not a date", "soon", 10.0),
            sample_purchase(2, "Food", "05/06/2024", "1", 10.0),
        ];
        let summary = dashboard_summary(&records, date(2024, 6, 15));
        assert_eq!(summary.date_fallbacks, 1);
        assert_eq!(summary.installment_fallbacks, 1);
    }

    #[test]
    fn test_dashboard_summary_of_empty_snapshot() {
        let summary = dashboard_summary(&[], date(2024, 6, 15));
        assert_eq!(summary.total_spend, 0.0);
        assert_eq!(summary.monthly_average, 0.0);
        assert_eq!(summary.change_vs_average_pct, 0.0);
        assert_eq!(summary.distinct_months, 1);
        assert!(summary.by_category.is_empty());
        assert!(summary.projections.is_empty());
    }
}
