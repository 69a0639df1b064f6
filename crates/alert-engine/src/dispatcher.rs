//! Single-consumer dispatch loop: split, correlate, patch, publish.

use std::future::Future;
use std::sync::Arc;

use alert_core::AggregateAlert;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::intake::IntakeReceiver;
use crate::publisher::Publisher;
use crate::table::CorrelationTable;

/// What processing one submitted candidate did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Chunks the candidate was split into (1 when not split, 0 for broadcasts).
    pub chunks: usize,
    /// Live aggregates that correlated with the candidate.
    pub correlated: usize,
    /// Correlated aggregates whose merge learned something new.
    pub merged: usize,
    /// Aggregates published as new posts.
    pub published: usize,
    /// Whether the candidate had no regions and was broadcast.
    pub broadcast: bool,
    pub posts_created: usize,
    pub posts_failed: usize,
    pub patches_sent: usize,
    pub patches_failed: usize,
}

/// Drains the intake queue one candidate at a time.
pub struct Dispatcher {
    table: Arc<CorrelationTable>,
    publisher: Publisher,
    max_regions_per_post: usize,
}

impl Dispatcher {
    pub fn new(table: Arc<CorrelationTable>, publisher: Publisher, max_regions_per_post: usize) -> Self {
        Self {
            table,
            publisher,
            max_regions_per_post: max_regions_per_post.max(1),
        }
    }

    /// Process one candidate to completion, excluding detached follow-ups.
    pub async fn process(&self, candidate: Arc<AggregateAlert>) -> DispatchReport {
        let mut report = DispatchReport::default();

        let regions = candidate.region_count();
        if regions == 0 {
            warn!(alert = candidate.id(), "Alert has no regions, broadcasting");
            let outcome = self.publisher.broadcast(&candidate).await;
            report.broadcast = true;
            report.posts_created = outcome.succeeded;
            report.posts_failed = outcome.failed;
            return report;
        }

        let chunks = if regions > self.max_regions_per_post {
            let chunks = candidate.split(self.max_regions_per_post);
            debug!(
                alert = candidate.id(),
                regions,
                chunks = chunks.len(),
                "Splitting oversized alert"
            );
            chunks.into_iter().map(Arc::new).collect()
        } else {
            vec![candidate]
        };

        report.chunks = chunks.len();
        for chunk in &chunks {
            self.process_chunk(chunk, &mut report).await;
        }
        report
    }

    async fn process_chunk(&self, candidate: &Arc<AggregateAlert>, report: &mut DispatchReport) {
        let correlation = self.table.correlate(candidate).await;
        report.correlated += correlation.to_patch.len();

        for prev in &correlation.to_patch {
            if !prev.patch_data(candidate) {
                debug!(alert = prev.id(), candidate = candidate.id(), "No new information");
                continue;
            }
            report.merged += 1;
            let outcome = self.publisher.republish(prev).await;
            report.patches_sent += outcome.succeeded;
            report.patches_failed += outcome.failed;
        }

        if !correlation.uncovered.is_empty() {
            let outcome = self.publisher.publish(candidate).await;
            report.published += 1;
            report.posts_created += outcome.succeeded;
            report.posts_failed += outcome.failed;
        }
    }

    /// Run until every intake producer is dropped.
    pub async fn run(self, mut intake: IntakeReceiver) -> Result<(), EngineError> {
        info!(
            destinations = self.publisher.destinations().len(),
            "Starting alert dispatcher"
        );

        while let Some(candidate) = intake.recv().await {
            let report = self.process(candidate).await;
            debug!(?report, "Dispatched alert");
        }

        info!("Alert intake closed, dispatcher stopping");
        Ok(())
    }

    /// Run until the intake closes or the shutdown signal completes.
    ///
    /// Candidates still queued at shutdown are dropped.
    pub async fn run_with_shutdown<S>(self, mut intake: IntakeReceiver, shutdown_signal: S) -> Result<(), EngineError>
    where
        S: Future<Output = ()> + Send,
    {
        info!(
            destinations = self.publisher.destinations().len(),
            "Starting alert dispatcher (graceful shutdown enabled)"
        );

        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown_signal => {
                    info!("Shutdown signal received, stopping dispatcher");
                    intake.close();
                    return Ok(());
                }

                candidate = intake.recv() => {
                    match candidate {
                        Some(candidate) => {
                            let report = self.process(candidate).await;
                            debug!(?report, "Dispatched alert");
                        }
                        None => {
                            info!("Alert intake closed, dispatcher stopping");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
