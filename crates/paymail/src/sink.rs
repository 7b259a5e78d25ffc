//! Downstream event sink client

use anyhow::{Context, Result};
use log::debug;

use crate::models::PaymentRecord;

/// Error indicating the sink rejected the record with an HTTP status
#[derive(Debug, thiserror::Error)]
#[error("Sink rejected record with status {0}")]
pub struct SinkRejectedError(pub u16);

/// Delivers normalized records to the downstream endpoint.
///
/// Success or failure is binary per record, with no internal retries;
/// retry policy belongs to the sync engine.
pub trait EventSink: Send + Sync {
    fn deliver(&self, record: &PaymentRecord) -> Result<()>;
}

/// HTTP-backed event sink
pub struct HttpEventSink {
    url: String,
}

impl HttpEventSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl EventSink for HttpEventSink {
    fn deliver(&self, record: &PaymentRecord) -> Result<()> {
        debug!("Delivering record for amount {}", record.amount);

        match ureq::post(&self.url).send_json(record) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(code)) => Err(SinkRejectedError(code).into()),
            Err(e) => Err(e).context("Failed to deliver record to sink"),
        }
    }
}
