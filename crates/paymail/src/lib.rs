//! Paymail - payment-notification mail sync
//!
//! This crate watches a mailbox for payment-notification mails from a
//! single trusted sender and forwards each as a normalized record to a
//! downstream HTTP sink, at-least-once with idempotency fencing. It
//! provides:
//! - Gmail API client and OAuth authentication
//! - A message-source abstraction with processed-marker fencing
//! - Regex-based record extraction from HTML bodies
//! - A watermark-driven sync engine with two-tier checkpointing
//! - A fixed-interval polling scheduler
//!
//! The engine depends only on traits ([`MessageSource`], [`Extractor`],
//! [`EventSink`], [`CheckpointStore`]), so every collaborator can be
//! replaced with a test double.

pub mod checkpoint;
pub mod config;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod sink;
pub mod source;
pub mod sync;

pub use checkpoint::{CheckpointStore, HttpCheckpointStore};
pub use config::{GmailCredentials, SyncSettings};
pub use extract::{Extraction, Extractor, PaymentExtractor};
pub use gmail::{GmailAuth, GmailClient};
pub use models::{FetchedMessage, MessageId, PaymentRecord};
pub use sink::{EventSink, HttpEventSink, SinkRejectedError};
pub use source::{GmailSource, MessageSource, Selection};
pub use sync::{CycleStats, SyncEngine, SyncOptions, run_polling_loop};
