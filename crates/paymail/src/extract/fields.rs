//! Per-field pattern extraction
//!
//! Each field is matched independently; a non-match yields a null field,
//! never an extraction failure. Patterns run against the flattened body
//! text, after entity decoding.

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use std::sync::LazyLock;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"₹\s*([\d,]+(?:\.\d{1,2})?)").unwrap());
static ORDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Order ID:\s*([A-Z0-9]+)").unwrap());
static ACCOUNT_OF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)In Account of\s*(.*?)\s*(?:Transaction|Nov|Dec|Jan)").unwrap());
static TRANSACTION_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Transaction Count #(\d+)").unwrap());
static FROM_UPI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)From\s*([A-Za-z0-9@.]+)").unwrap());
// Matches the embedded human-readable form, e.g. "Nov 26, 2025, 10:31 AM"
static DATETIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]{2}\s\d{1,2},\s\d{4},\s\d{1,2}:\d{2}\s[APM]{2})").unwrap());

/// Format of the embedded date-time string
const DATETIME_FORMAT: &str = "%b %d, %Y, %I:%M %p";

/// Raw field captures from one body text
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawFields {
    pub amount: Option<String>,
    pub order_id: Option<String>,
    pub account_of: Option<String>,
    pub transaction_count: Option<String>,
    pub from_upi: Option<String>,
    pub datetime: Option<String>,
}

/// Run every field pattern over the flattened text
pub fn extract_fields(text: &str) -> RawFields {
    RawFields {
        amount: capture(&AMOUNT, text),
        order_id: capture(&ORDER_ID, text),
        account_of: capture(&ACCOUNT_OF, text),
        transaction_count: capture(&TRANSACTION_COUNT, text),
        from_upi: capture(&FROM_UPI, text),
        datetime: capture(&DATETIME, text),
    }
}

/// Resolve the embedded date-time string to Unix seconds.
///
/// The string carries no zone, so the configured fixed offset is applied.
/// Returns None when the string does not parse.
pub fn resolve_payload_time(datetime: &str, offset: FixedOffset) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(datetime, DATETIME_FORMAT).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    #[test]
    fn test_amount_with_decimals_and_commas() {
        assert_eq!(
            extract_fields("₹ 1,234.50 received").amount,
            Some("1,234.50".to_string())
        );
        assert_eq!(extract_fields("₹500 received").amount, Some("500".to_string()));
    }

    #[test]
    fn test_absent_fields_are_none() {
        let fields = extract_fields("₹ 100 received");
        assert_eq!(fields.amount, Some("100".to_string()));
        assert_eq!(fields.order_id, None);
        assert_eq!(fields.account_of, None);
        assert_eq!(fields.from_upi, None);
        assert_eq!(fields.datetime, None);
    }

    #[test]
    fn test_account_of_stops_at_following_field() {
        let fields =
            extract_fields("In Account of Jane Doe Transaction Count #12 more text");
        assert_eq!(fields.account_of, Some("Jane Doe".to_string()));
        assert_eq!(fields.transaction_count, Some("12".to_string()));
    }

    #[test]
    fn test_upi_handle_with_dot() {
        let fields = extract_fields("From jane.doe@okbank today");
        assert_eq!(fields.from_upi, Some("jane.doe@okbank".to_string()));
    }

    #[test]
    fn test_datetime_capture() {
        let fields = extract_fields("Paid on Nov 26, 2025, 10:31 AM via UPI");
        assert_eq!(fields.datetime, Some("Nov 26, 2025, 10:31 AM".to_string()));
    }

    #[test]
    fn test_resolve_payload_time_applies_offset() {
        let ts = resolve_payload_time("Nov 26, 2025, 10:31 AM", ist()).unwrap();
        let expected = ist()
            .with_ymd_and_hms(2025, 11, 26, 10, 31, 0)
            .unwrap()
            .timestamp();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_resolve_payload_time_pm() {
        let ts = resolve_payload_time("Dec 1, 2025, 9:05 PM", ist()).unwrap();
        let expected = ist()
            .with_ymd_and_hms(2025, 12, 1, 21, 5, 0)
            .unwrap()
            .timestamp();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_resolve_payload_time_rejects_garbage() {
        assert_eq!(resolve_payload_time("yesterday-ish", ist()), None);
    }
}
