//! Purchase-date and installment-count parsing
//!
//! Parsing here is deliberately lenient: the dashboard is best-effort, so a
//! malformed date falls back to the caller's "today" and a malformed
//! installment count falls back to 1 instead of surfacing an error. Every
//! fallback increments a counter on [`ParseDiagnostics`] so callers that
//! want stricter behavior can see how much of the data was defaulted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// English month names; projection buckets are keyed by these
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Month name for a zero-based month index; wraps past December, which is
/// how projection offsets beyond a year fold back onto the same buckets
pub fn month_name(index0: usize) -> &'static str {
    MONTH_NAMES[index0 % 12]
}

/// Counts of silently defaulted values observed during a computation
///
/// Counters are atomic so a single instance can be threaded through an
/// aggregation pass by shared reference.
#[derive(Debug, Default)]
pub struct ParseDiagnostics {
    date_fallbacks: AtomicU64,
    installment_fallbacks: AtomicU64,
}

impl ParseDiagnostics {
    pub fn record_date_fallback(&self) {
        self.date_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_installment_fallback(&self) {
        self.installment_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of dates that fell back to "today"
    pub fn date_fallbacks(&self) -> u64 {
        self.date_fallbacks.load(Ordering::Relaxed)
    }

    /// Number of installment counts that fell back to 1
    pub fn installment_fallbacks(&self) -> u64 {
        self.installment_fallbacks.load(Ordering::Relaxed)
    }
}

fn dmy_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"))
}

fn installment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(\d+)\s*x?\s*$").expect("valid regex"))
}

/// Parse a purchase date in `DD/MM/YYYY`, ISO `YYYY-MM-DD`, or RFC 3339 form
///
/// Anything else, including calendar-impossible dates like `31/02/2024`,
/// falls back to `today` and increments the diagnostics counter. Never
/// panics, never errors.
pub fn parse_purchase_date(raw: &str, today: NaiveDate, diag: &ParseDiagnostics) -> NaiveDate {
    match try_parse_date(raw) {
        Some(date) => date,
        None => {
            diag.record_date_fallback();
            today
        }
    }
}

/// Strict parse attempt; `None` on any failure
fn try_parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = dmy_regex().captures(trimmed) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    // Imported data sometimes carries full timestamps
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    None
}

/// Parse an installment count like `"3"` or `"3x"`
///
/// Missing, zero, or unparseable counts fall back to 1 so the
/// per-installment division is never by zero. Fallbacks are counted.
pub fn parse_installment_count(raw: &str, diag: &ParseDiagnostics) -> u32 {
    match try_parse_installments(raw) {
        Some(count) => count,
        None => {
            diag.record_installment_fallback();
            1
        }
    }
}

fn try_parse_installments(raw: &str) -> Option<u32> {
    let caps = installment_regex().captures(raw)?;
    let count: u32 = caps[1].parse().ok()?;
    if count == 0 {
        None
    } else {
        Some(count)
    }
}

/// Render a raw purchase date for tables: zero-padded `DD/MM/YYYY`, or
/// `"invalid date"` when the input doesn't parse
pub fn format_display_date(raw: &str) -> String {
    match try_parse_date(raw) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => "invalid date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_dmy() {
        let diag = ParseDiagnostics::default();
        let today = date(2024, 6, 1);
        assert_eq!(
            parse_purchase_date("15/03/2024", today, &diag),
            date(2024, 3, 15)
        );
        assert_eq!(
            parse_purchase_date("1/3/2024", today, &diag),
            date(2024, 3, 1)
        );
        assert_eq!(diag.date_fallbacks(), 0);
    }

    #[test]
    fn test_parse_iso() {
        let diag = ParseDiagnostics::default();
        let today = date(2024, 6, 1);
        assert_eq!(
            parse_purchase_date("2024-03-15", today, &diag),
            date(2024, 3, 15)
        );
        assert_eq!(diag.date_fallbacks(), 0);
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let diag = ParseDiagnostics::default();
        let today = date(2024, 6, 1);
        assert_eq!(
            parse_purchase_date("2024-03-15T10:30:00Z", today, &diag),
            date(2024, 3, 15)
        );
    }

    #[test]
    fn test_impossible_date_falls_back() {
        let diag = ParseDiagnostics::default();
        let today = date(2024, 6, 1);
        // 31/02/2024 matches the DD/MM/YYYY shape but isn't a real date
        assert_eq!(parse_purchase_date("31/02/2024", today, &diag), today);
        assert_eq!(diag.date_fallbacks(), 1);
    }

    #[test]
    fn test_garbage_and_empty_fall_back() {
        let diag = ParseDiagnostics::default();
        let today = date(2024, 6, 1);
        assert_eq!(parse_purchase_date("", today, &diag), today);
        assert_eq!(parse_purchase_date("soon", today, &diag), today);
        assert_eq!(parse_purchase_date("03/2024", today, &diag), today);
        assert_eq!(diag.date_fallbacks(), 3);
    }

    #[test]
    fn test_parse_installments() {
        let diag = ParseDiagnostics::default();
        assert_eq!(parse_installment_count("3", &diag), 3);
        assert_eq!(parse_installment_count("12x", &diag), 12);
        assert_eq!(parse_installment_count(" 6 X ", &diag), 6);
        assert_eq!(diag.installment_fallbacks(), 0);
    }

    #[test]
    fn test_installment_fallbacks() {
        let diag = ParseDiagnostics::default();
        assert_eq!(parse_installment_count("", &diag), 1);
        assert_eq!(parse_installment_count("x", &diag), 1);
        assert_eq!(parse_installment_count("many", &diag), 1);
        // Zero would divide the amount by zero; it is not a valid count
        assert_eq!(parse_installment_count("0", &diag), 1);
        assert_eq!(diag.installment_fallbacks(), 4);
    }

    #[test]
    fn test_month_name_wraps() {
        assert_eq!(month_name(0), "January");
        assert_eq!(month_name(11), "December");
        assert_eq!(month_name(12), "January");
        assert_eq!(month_name(25), "February");
    }

    #[test]
    fn test_format_display_date() {
        assert_eq!(format_display_date("2024-03-05"), "05/03/2024");
        assert_eq!(format_display_date("5/3/2024"), "05/03/2024");
        assert_eq!(format_display_date("31/02/2024"), "invalid date");
        assert_eq!(format_display_date("nope"), "invalid date");
    }
}
