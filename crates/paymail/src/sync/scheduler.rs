//! Fixed-interval polling scheduler

use log::{error, info};
use std::thread;
use std::time::Duration;

use super::SyncEngine;

/// Drive the engine on a fixed delay, forever.
///
/// Any error escaping a cycle is logged and never terminates the loop.
/// The sleep is a fixed delay between cycles, not a fixed rate, so
/// intervals drift under load. `run_once` collapses the loop to a single
/// cycle for one-shot invocations.
pub fn run_polling_loop(engine: &mut SyncEngine, interval: Duration, run_once: bool) {
    loop {
        match engine.run_cycle() {
            Ok(stats) => {
                if stats.found > 0 || stats.aborted {
                    info!(
                        "Cycle done in {}ms: {} found, {} delivered, {} fenced, cursor {}{}",
                        stats.duration_ms,
                        stats.found,
                        stats.delivered,
                        stats.parse_failures + stats.missing_body,
                        stats.cursor,
                        if stats.aborted { " (batch aborted)" } else { "" }
                    );
                }
            }
            Err(e) => error!("Sync cycle failed: {:#}", e),
        }

        if run_once {
            break;
        }
        thread::sleep(interval);
    }
}
