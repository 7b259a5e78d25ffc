//! Sync engine: one watermark-driven polling cycle
//!
//! The engine owns the two-tier checkpoint state: `local_cursor` is the
//! authoritative in-memory watermark, `last_persisted` what the remote
//! store last accepted. The cursor only ever moves forward, and only after
//! a message has been durably handled.
//!
//! Failure taxonomy: a source or sink error mid-batch is transient and
//! aborts the rest of the batch unmarked, so the next cycle re-selects and
//! retries. A missing body or unparseable amount is permanent and is fenced
//! off with the processed marker so it can never block the cursor.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::checkpoint::CheckpointStore;
use crate::extract::{Extraction, Extractor};
use crate::models::MessageId;
use crate::sink::EventSink;
use crate::source::MessageSource;

/// Lookback for the initial watermark when no checkpoint store is
/// configured: 24h
const DEFAULT_LOOKBACK_SECS: i64 = 86_400;

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Pause after each successful delivery, bounding the outbound request
    /// rate to the sink and the source
    pub throttle: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(4),
        }
    }
}

/// Statistics from one polling cycle
#[derive(Debug, Default, Clone)]
pub struct CycleStats {
    /// Candidates returned by the source query
    pub found: usize,
    /// Records delivered to the sink
    pub delivered: usize,
    /// Messages fenced off because no amount could be recovered
    pub parse_failures: usize,
    /// Messages fenced off because no body could be located
    pub missing_body: usize,
    /// Whether the batch was aborted on a transient failure
    pub aborted: bool,
    /// Whether the watermark was persisted to the remote store
    pub checkpointed: bool,
    /// The local cursor after the cycle
    pub cursor: i64,
    /// Duration of the cycle
    pub duration_ms: u64,
}

/// How one message left the processing loop
enum Outcome {
    Delivered { delivered_at: i64 },
    MissingBody { delivered_at: i64 },
    ParseFailure { delivered_at: i64 },
}

/// Orchestrates polling cycles against injected source, extractor, sink
/// and checkpoint store
pub struct SyncEngine {
    source: Arc<dyn MessageSource>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn EventSink>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
    options: SyncOptions,
    local_cursor: i64,
    last_persisted: i64,
}

impl SyncEngine {
    pub fn new(
        source: Arc<dyn MessageSource>,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn EventSink>,
        checkpoint: Option<Arc<dyn CheckpointStore>>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            extractor,
            sink,
            checkpoint,
            options,
            local_cursor: 0,
            last_persisted: 0,
        }
    }

    /// Initialize the local cursor, once per process start
    pub fn initialize(&mut self) {
        let watermark = match &self.checkpoint {
            Some(store) => store.get_watermark(),
            None => chrono::Utc::now().timestamp() - DEFAULT_LOOKBACK_SECS,
        };
        self.local_cursor = watermark;
        self.last_persisted = watermark;
        info!("Sync starting from watermark {}", watermark);
    }

    /// The authoritative in-memory watermark
    pub fn cursor(&self) -> i64 {
        self.local_cursor
    }

    /// Run one polling cycle
    pub fn run_cycle(&mut self) -> Result<CycleStats> {
        let start = Instant::now();
        let mut stats = CycleStats::default();

        self.source.ensure_marker()?;

        let mut candidates = self.source.list_candidates(self.local_cursor)?;
        stats.found = candidates.len();

        if candidates.is_empty() {
            debug!("No new messages after {}", self.local_cursor);
        } else {
            info!("Found {} new messages", candidates.len());

            // Source order is newest first; process oldest first so an
            // aborted batch leaves the cursor at a contiguous processed
            // prefix.
            candidates.reverse();

            let mut max_seen = self.local_cursor;

            for id in &candidates {
                match self.process_message(id) {
                    Ok(Outcome::Delivered { delivered_at }) => {
                        stats.delivered += 1;
                        max_seen = max_seen.max(delivered_at);
                        if !self.options.throttle.is_zero() {
                            thread::sleep(self.options.throttle);
                        }
                    }
                    Ok(Outcome::MissingBody { delivered_at }) => {
                        stats.missing_body += 1;
                        max_seen = max_seen.max(delivered_at);
                    }
                    Ok(Outcome::ParseFailure { delivered_at }) => {
                        stats.parse_failures += 1;
                        max_seen = max_seen.max(delivered_at);
                    }
                    Err(e) => {
                        // Transient: leave this message unmarked and the
                        // cursor at the last good message; the next cycle
                        // re-selects and retries from here.
                        warn!("[{}] {:#}; aborting batch", id.as_str(), e);
                        stats.aborted = true;
                        break;
                    }
                }
            }

            if max_seen > self.local_cursor {
                info!("Cursor advanced {} -> {}", self.local_cursor, max_seen);
                self.local_cursor = max_seen;
            }
        }

        self.persist_cursor(&mut stats);

        stats.cursor = self.local_cursor;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Handle one candidate.
    ///
    /// `Ok` outcomes have been marked processed; `Err` means a transient
    /// fault and the message is untouched.
    fn process_message(&self, id: &MessageId) -> Result<Outcome> {
        let message = self.source.fetch_full(id).context("Fetch failed")?;

        let Some(encoded) = message.body.as_deref() else {
            info!("[{}] Body missing, marking processed", id.as_str());
            self.source
                .mark_processed(id)
                .context("Mark after missing body failed")?;
            return Ok(Outcome::MissingBody {
                delivered_at: message.delivered_at,
            });
        };

        match self.extractor.extract(encoded, message.event_ts) {
            Extraction::ParseFailure => {
                info!("[{}] No recoverable amount, marking processed", id.as_str());
                self.source
                    .mark_processed(id)
                    .context("Mark after parse failure failed")?;
                Ok(Outcome::ParseFailure {
                    delivered_at: message.delivered_at,
                })
            }
            Extraction::Record(record) => {
                debug!("[{}] Delivering amount {}", id.as_str(), record.amount);
                self.sink.deliver(&record).context("Delivery failed")?;
                self.source
                    .mark_processed(id)
                    .context("Mark after delivery failed")?;
                Ok(Outcome::Delivered {
                    delivered_at: message.delivered_at,
                })
            }
        }
    }

    /// Flush the cursor to the remote store when it has moved past the
    /// persisted value. Failures keep `last_persisted` unchanged; the
    /// in-memory cursor already carries the progress, so the write is
    /// simply retried on a later cycle.
    fn persist_cursor(&mut self, stats: &mut CycleStats) {
        let Some(store) = &self.checkpoint else {
            return;
        };
        if self.local_cursor <= self.last_persisted {
            return;
        }

        match store.put_watermark(self.local_cursor) {
            Ok(()) => {
                debug!("Watermark persisted: {}", self.local_cursor);
                self.last_persisted = self.local_cursor;
                stats.checkpointed = true;
            }
            Err(e) => {
                warn!("Failed to persist watermark {}: {:#}", self.local_cursor, e);
            }
        }
    }
}
