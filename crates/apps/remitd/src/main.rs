//! Remitd - payment-notification mail sync daemon
//!
//! Wires the Gmail source, extractor, sink and checkpoint store into the
//! sync engine and drives it on a fixed polling interval.
//!
//! Exit codes: 2 when OAuth client credentials are missing, 1 when the
//! authorization bootstrap or settings load fails. Nothing else
//! terminates the process; per-cycle failures are logged and retried.

use log::{error, info};
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use paymail::{
    CheckpointStore, GmailAuth, GmailClient, GmailCredentials, GmailSource, HttpCheckpointStore,
    HttpEventSink, PaymentExtractor, SyncEngine, SyncOptions, SyncSettings, run_polling_loop,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {:#}", e);
    }

    let settings = match SyncSettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{:#}", e);
            exit(1);
        }
    };

    let credentials = match GmailCredentials::load() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Gmail credentials not found: {:#}", e);
            if let Some(path) = GmailCredentials::default_credentials_path() {
                error!(
                    "Place your Google OAuth credentials at {} or set \
                     GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                    path.display()
                );
            }
            exit(2);
        }
    };

    let auth = match GmailAuth::new(credentials.client_id, credentials.client_secret) {
        Ok(auth) => auth,
        Err(e) => {
            error!("Failed to set up Gmail auth: {:#}", e);
            exit(2);
        }
    };

    let client = Arc::new(GmailClient::new(auth));
    // Interactive on first run; refreshes silently afterwards
    if let Err(e) = client.authenticate() {
        error!("Gmail authorization failed: {:#}", e);
        exit(1);
    }

    let source = Arc::new(GmailSource::new(
        client,
        settings.sender.clone(),
        settings.marker_label.clone(),
        settings.selection,
    ));
    let extractor = Arc::new(PaymentExtractor::with_offset_minutes(
        settings.payload_tz_offset_minutes,
    ));
    let sink = Arc::new(HttpEventSink::new(settings.sink_url.clone()));

    let checkpoint: Option<Arc<dyn CheckpointStore>> = match settings.checkpoint_urls() {
        Some((read, write)) => Some(Arc::new(HttpCheckpointStore::new(read, write))),
        None => {
            info!("No checkpoint endpoints configured; remote checkpointing disabled");
            None
        }
    };

    let options = SyncOptions {
        throttle: Duration::from_secs(settings.throttle_secs),
    };

    let mut engine = SyncEngine::new(source, extractor, sink, checkpoint, options);
    engine.initialize();

    info!(
        "remitd watching mail from {} every {}s",
        settings.sender, settings.poll_interval_secs
    );

    run_polling_loop(
        &mut engine,
        Duration::from_secs(settings.poll_interval_secs),
        settings.run_once,
    );
}
