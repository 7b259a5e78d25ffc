//! Record extraction from raw message bodies
//!
//! The engine only sees the [`Extractor`] contract; the regex-backed
//! [`PaymentExtractor`] is the one part of the system expected to need
//! frequent tuning, so it stays independently testable and swappable
//! without touching the checkpoint invariants.

mod fields;
mod html;

pub use fields::{RawFields, extract_fields, resolve_payload_time};
pub use html::flatten_html;

use base64::prelude::*;
use chrono::FixedOffset;

use crate::models::PaymentRecord;

/// Outcome of running extraction over one body
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A normalized record ready for delivery
    Record(PaymentRecord),
    /// No recoverable monetary amount. A permanent condition of the
    /// message, not an engine failure.
    ParseFailure,
}

/// Turns a raw encoded body into a candidate record or a parse failure
pub trait Extractor: Send + Sync {
    /// Extract a record from a base64url-encoded body.
    ///
    /// `event_ts` is the message's own timestamp in Unix seconds; it becomes
    /// the record's `timestamp` and the fallback for `txn_time`.
    fn extract(&self, encoded_body: &str, event_ts: i64) -> Extraction;
}

/// Default offset for embedded date-times carrying no zone (IST, +05:30)
const DEFAULT_OFFSET_MINUTES: i32 = 330;

/// Regex-based extractor for payment-notification mails
pub struct PaymentExtractor {
    payload_offset: FixedOffset,
}

impl PaymentExtractor {
    pub fn new(payload_offset: FixedOffset) -> Self {
        Self { payload_offset }
    }

    /// Build an extractor from an offset in minutes east of UTC
    pub fn with_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(DEFAULT_OFFSET_MINUTES * 60).unwrap());
        Self::new(offset)
    }
}

impl Default for PaymentExtractor {
    fn default() -> Self {
        Self::with_offset_minutes(DEFAULT_OFFSET_MINUTES)
    }
}

impl Extractor for PaymentExtractor {
    fn extract(&self, encoded_body: &str, event_ts: i64) -> Extraction {
        let Some(html) = decode_base64_body(encoded_body) else {
            return Extraction::ParseFailure;
        };

        let text = flatten_html(&html);
        let fields = extract_fields(&text);

        let Some(amount) = fields.amount else {
            return Extraction::ParseFailure;
        };

        let txn_time = fields
            .datetime
            .as_deref()
            .and_then(|s| resolve_payload_time(s, self.payload_offset))
            .unwrap_or(event_ts);

        Extraction::Record(PaymentRecord {
            amount,
            order_id: fields.order_id,
            account_of: fields.account_of,
            from_upi: fields.from_upi,
            transaction_count: fields.transaction_count,
            timestamp: event_ts,
            txn_time,
        })
    }
}

/// Decode base64-encoded body data
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple
/// decoders.
fn decode_base64_body(data: &str) -> Option<String> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data)
            && let Ok(s) = String::from_utf8(decoded)
        {
            return Some(s);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn encode(html: &str) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(html)
    }

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    #[test]
    fn test_full_notification_round_trip() {
        let html = "<div>&#8377;1,234.50 received</div>\
                    <div>Order ID: ABC123</div>\
                    <div>From someone@upi</div>\
                    <div>In Account of Jane Doe</div>\
                    <div>Nov 26, 2025, 10:31 AM</div>";

        let extraction = PaymentExtractor::default().extract(&encode(html), 1_764_130_860);

        let Extraction::Record(record) = extraction else {
            panic!("expected a record");
        };
        assert_eq!(record.amount, "1,234.50");
        assert_eq!(record.order_id.as_deref(), Some("ABC123"));
        assert_eq!(record.from_upi.as_deref(), Some("someone@upi"));
        assert_eq!(record.account_of.as_deref(), Some("Jane Doe"));
        assert_eq!(record.timestamp, 1_764_130_860);

        let expected_txn = ist()
            .with_ymd_and_hms(2025, 11, 26, 10, 31, 0)
            .unwrap()
            .timestamp();
        assert_eq!(record.txn_time, expected_txn);
    }

    #[test]
    fn test_missing_amount_is_parse_failure() {
        let html = "<div>Order ID: ABC123</div><div>From someone@upi</div>";
        let extraction = PaymentExtractor::default().extract(&encode(html), 100);
        assert_eq!(extraction, Extraction::ParseFailure);
    }

    #[test]
    fn test_undecodable_body_is_parse_failure() {
        let extraction = PaymentExtractor::default().extract("!!not-base64!!", 100);
        assert_eq!(extraction, Extraction::ParseFailure);
    }

    #[test]
    fn test_missing_datetime_falls_back_to_event_time() {
        let html = "<div>&#8377;500 received</div>";
        let extraction = PaymentExtractor::default().extract(&encode(html), 1_764_130_860);

        let Extraction::Record(record) = extraction else {
            panic!("expected a record");
        };
        assert_eq!(record.amount, "500");
        assert_eq!(record.txn_time, 1_764_130_860);
    }

    #[test]
    fn test_standard_base64_accepted() {
        let html = "<div>&#8377;42</div>";
        let encoded = BASE64_STANDARD.encode(html);
        let extraction = PaymentExtractor::default().extract(&encoded, 7);
        assert!(matches!(extraction, Extraction::Record(_)));
    }
}
