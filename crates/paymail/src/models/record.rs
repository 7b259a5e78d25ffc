//! Normalized payment record delivered to the event sink

use serde::{Deserialize, Serialize};

/// A normalized payment event extracted from one notification mail.
///
/// All fields except `amount` are independently optional; a body with no
/// recoverable amount never becomes a record in the first place.
///
/// `timestamp` carries the mail's own date, `txn_time` the payment time
/// recovered from the body text (falling back to `timestamp`). The wire
/// format is camelCase except the literal `txn_time` key the sink expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub amount: String,
    pub order_id: Option<String>,
    pub account_of: Option<String>,
    pub from_upi: Option<String>,
    pub transaction_count: Option<String>,
    pub timestamp: i64,
    #[serde(rename = "txn_time")]
    pub txn_time: i64,
}
