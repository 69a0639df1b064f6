//! Periodic expiry and dirty-flush task.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::publisher::Publisher;
use crate::table::CorrelationTable;
use crate::telemetry;

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Dirty aggregates that were re-published.
    pub flushed: usize,
    /// Region mappings removed because their aggregate expired.
    pub expired: usize,
    pub patches_sent: usize,
    pub patches_failed: usize,
}

/// Evicts expired aggregates and flushes pending changes.
pub struct Sweeper {
    table: Arc<CorrelationTable>,
    publisher: Publisher,
    interval: Duration,
}

impl Sweeper {
    pub fn new(table: Arc<CorrelationTable>, publisher: Publisher, interval: Duration) -> Self {
        Self {
            table,
            publisher,
            interval,
        }
    }

    /// Sweep the table once and wait for the resulting patches.
    ///
    /// The table lock is released before any patch is sent.
    pub async fn sweep_once(&self) -> SweepReport {
        let (dirty, expired) = self.table.sweep(Instant::now()).await;
        if expired > 0 {
            telemetry::record_expired(expired);
        }

        let mut report = SweepReport {
            flushed: dirty.len(),
            expired,
            ..Default::default()
        };

        let outcomes = join_all(dirty.iter().map(|alert| self.publisher.republish(alert))).await;
        for outcome in outcomes {
            report.patches_sent += outcome.succeeded;
            report.patches_failed += outcome.failed;
        }

        if report.flushed > 0 || report.expired > 0 {
            debug!(?report, "Sweep finished");
        }
        report
    }

    /// Sweep every interval until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.interval, "Starting expiry sweeper");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Expiry sweeper cancelled");
                    return;
                }

                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Spawn [`Sweeper::run`] on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
