//! Remote checkpoint store client
//!
//! The store persists a single watermark so a restarted process can resume
//! near where it left off. It is an optimization, not a correctness
//! dependency: reads degrade to time-based defaults and writes are
//! best-effort.

use anyhow::{Context, Result};
use chrono::DateTime;
use log::{info, warn};
use serde::Deserialize;

/// Numeric watermarks above this are Unix milliseconds, not seconds
const MILLIS_THRESHOLD: i64 = 9_999_999_999;

/// Lookback when the store has no watermark yet (first run): 24h
const ABSENT_FALLBACK_SECS: i64 = 86_400;

/// Lookback when the store cannot be reached: 1h.
///
/// Narrower than the first-run fallback: an unreachable store that held
/// data before is a near-miss, not a cold start.
const UNREACHABLE_FALLBACK_SECS: i64 = 3_600;

/// Reads and writes the persisted watermark
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted watermark in Unix seconds.
    ///
    /// Never fails; degrades to a time-based default instead.
    fn get_watermark(&self) -> i64;

    /// Persist a watermark. Best-effort; the caller logs failures and
    /// retries on a later cycle.
    fn put_watermark(&self, watermark: i64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct WatermarkResponse {
    last_mail_timestamp: Option<WatermarkValue>,
}

/// The stored value may be a number (seconds or milliseconds) or a
/// formatted date string, depending on who last wrote it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WatermarkValue {
    Number(i64),
    Text(String),
}

/// HTTP-backed checkpoint store
pub struct HttpCheckpointStore {
    read_url: String,
    write_url: String,
}

impl HttpCheckpointStore {
    pub fn new(read_url: impl Into<String>, write_url: impl Into<String>) -> Self {
        Self {
            read_url: read_url.into(),
            write_url: write_url.into(),
        }
    }
}

impl CheckpointStore for HttpCheckpointStore {
    fn get_watermark(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();

        let mut response = match ureq::get(&self.read_url).call() {
            Ok(response) => response,
            Err(e) => {
                warn!("Checkpoint store unreachable, starting 1h back: {}", e);
                return now - UNREACHABLE_FALLBACK_SECS;
            }
        };

        let body: WatermarkResponse = match response.body_mut().read_json() {
            Ok(body) => body,
            Err(e) => {
                warn!("Malformed checkpoint response, starting 24h back: {}", e);
                return now - ABSENT_FALLBACK_SECS;
            }
        };

        match body.last_mail_timestamp {
            Some(value) => normalize_watermark(&value, now),
            None => {
                info!("No watermark stored yet, starting 24h back");
                now - ABSENT_FALLBACK_SECS
            }
        }
    }

    fn put_watermark(&self, watermark: i64) -> Result<()> {
        ureq::post(&self.write_url)
            .send_json(serde_json::json!({ "last_mail_timestamp": watermark }))
            .context("Failed to update checkpoint watermark")?;
        Ok(())
    }
}

/// Normalize a stored watermark value to Unix seconds.
///
/// Magnitude disambiguates seconds from milliseconds; date strings are
/// parsed, and anything unparseable degrades to the 24h default.
fn normalize_watermark(value: &WatermarkValue, now: i64) -> i64 {
    match value {
        WatermarkValue::Number(n) => normalize_epoch(*n),
        WatermarkValue::Text(s) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                return normalize_epoch(n);
            }
            parse_date_string(s).unwrap_or(now - ABSENT_FALLBACK_SECS)
        }
    }
}

fn normalize_epoch(n: i64) -> i64 {
    if n > MILLIS_THRESHOLD { n / 1000 } else { n }
}

fn parse_date_string(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_764_200_000;

    #[test]
    fn test_seconds_pass_through_unchanged() {
        let value = WatermarkValue::Number(1_764_130_860);
        assert_eq!(normalize_watermark(&value, NOW), 1_764_130_860);
        // Anything at or below the threshold is already seconds
        let value = WatermarkValue::Number(9_999_999_999);
        assert_eq!(normalize_watermark(&value, NOW), 9_999_999_999);
    }

    #[test]
    fn test_milliseconds_floor_divided() {
        let value = WatermarkValue::Number(1_764_130_860_123);
        assert_eq!(normalize_watermark(&value, NOW), 1_764_130_860);
        let value = WatermarkValue::Number(10_000_000_000);
        assert_eq!(normalize_watermark(&value, NOW), 10_000_000);
    }

    #[test]
    fn test_numeric_string_normalized() {
        let value = WatermarkValue::Text("1764130860123".to_string());
        assert_eq!(normalize_watermark(&value, NOW), 1_764_130_860);
        let value = WatermarkValue::Text("1764130860".to_string());
        assert_eq!(normalize_watermark(&value, NOW), 1_764_130_860);
    }

    #[test]
    fn test_rfc2822_date_string() {
        let value = WatermarkValue::Text("Wed, 26 Nov 2025 05:01:00 +0000".to_string());
        let expected = DateTime::parse_from_rfc2822("Wed, 26 Nov 2025 05:01:00 +0000")
            .unwrap()
            .timestamp();
        assert_eq!(normalize_watermark(&value, NOW), expected);
    }

    #[test]
    fn test_rfc3339_date_string() {
        let value = WatermarkValue::Text("2025-11-26T05:01:00Z".to_string());
        let expected = DateTime::parse_from_rfc3339("2025-11-26T05:01:00Z")
            .unwrap()
            .timestamp();
        assert_eq!(normalize_watermark(&value, NOW), expected);
    }

    #[test]
    fn test_garbage_string_defaults_24h_back() {
        let value = WatermarkValue::Text("last tuesday".to_string());
        assert_eq!(normalize_watermark(&value, NOW), NOW - ABSENT_FALLBACK_SECS);
    }

    #[test]
    fn test_untagged_value_deserialization() {
        let body: WatermarkResponse =
            serde_json::from_str(r#"{ "last_mail_timestamp": 1764130860 }"#).unwrap();
        assert!(matches!(
            body.last_mail_timestamp,
            Some(WatermarkValue::Number(1_764_130_860))
        ));

        let body: WatermarkResponse =
            serde_json::from_str(r#"{ "last_mail_timestamp": "2025-11-26T05:01:00Z" }"#).unwrap();
        assert!(matches!(
            body.last_mail_timestamp,
            Some(WatermarkValue::Text(_))
        ));

        let body: WatermarkResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.last_mail_timestamp.is_none());
    }
}
