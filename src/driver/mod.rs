pub mod notifier;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::domain::DashboardSnapshot;
use crate::driver::notifier::Notifier;
use crate::mailbox::Mailbox;
use crate::reducer;

pub struct DriverConfig {
    /// Poll interval between mailbox drains.
    pub tick: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
        }
    }
}

/// Headless presentation loop: each tick drains the mailbox, folds every
/// event into the snapshot and surfaces reducer notifications as toasts.
/// Runs until the running flag is cleared (Ctrl-C in `main`); returns the
/// final snapshot.
pub fn run_driver(
    mailbox: &Mailbox,
    notifier: &Notifier,
    cfg: &DriverConfig,
    running: &AtomicBool,
) -> DashboardSnapshot {
    let mut snapshot = DashboardSnapshot::default();

    while running.load(Ordering::SeqCst) {
        let events = mailbox.drain();
        for event in &events {
            let connection_before = snapshot.connection;
            let stats_before = snapshot.stats.clone();

            let note = reducer::fold(&mut snapshot, event);

            if snapshot.connection != connection_before {
                info!("connection: {}", snapshot.connection);
            }
            if snapshot.stats != stats_before {
                info!(
                    "stats: processed={} replies={} manual={} errors={}",
                    snapshot.stats.total_processed,
                    snapshot.stats.successful_replies,
                    snapshot.stats.manual_reviews,
                    snapshot.stats.errors
                );
            }
            if let Some(note) = note {
                notifier.notify(&note);
            }
        }
        if !events.is_empty() {
            debug!("folded {} event(s)", events.len());
        }
        thread::sleep(cfg.tick);
    }

    snapshot
}
