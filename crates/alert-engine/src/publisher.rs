//! Rendering and delivery of aggregates to every destination.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alert_core::{
    AggregateAlert, Delivery, Destination, Language, PostId, Presenter, RenderedContent, Transport,
    TransportError,
};
use futures::future::join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::telemetry;

/// Success and failure counts of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl Outcome {
    fn add(&mut self, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Renders aggregates and drives create, patch and reaction calls.
///
/// Every transport call is bounded by the post timeout. Failures are logged,
/// counted and skipped; they never stop the remaining destinations.
#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn Presenter>,
    destinations: Arc<[Destination]>,
    post_timeout: Duration,
    settle_delay: Option<Duration>,
}

impl Publisher {
    pub fn new(
        transport: Arc<dyn Transport>,
        presenter: Arc<dyn Presenter>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            transport,
            presenter,
            destinations: config.destinations.clone().into(),
            post_timeout: config.post_timeout,
            settle_delay: config.settle_delay,
        }
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Render the aggregate once per language.
    pub fn render_all<I>(&self, alert: &AggregateAlert, languages: I) -> HashMap<Language, RenderedContent>
    where
        I: IntoIterator<Item = Language>,
    {
        let snapshot = alert.snapshot();
        let mut rendered = HashMap::new();
        for language in languages {
            rendered
                .entry(language)
                .or_insert_with(|| self.presenter.render(&snapshot, language));
        }
        rendered
    }

    /// Create one post per destination and record the deliveries.
    ///
    /// Each created post gets a detached follow-up: a reaction marker for
    /// categories that have one, then a settle patch.
    pub async fn publish(&self, alert: &Arc<AggregateAlert>) -> Outcome {
        let deliveries = self.create_posts(alert).await;
        let mut outcome = Outcome::default();

        for result in deliveries {
            outcome.add(result.is_some());
            if let Some(delivery) = result {
                self.spawn_follow_up(Arc::clone(alert), delivery);
            }
        }

        info!(
            alert = alert.id(),
            regions = alert.region_count(),
            posted = outcome.succeeded,
            failed = outcome.failed,
            "Published alert"
        );
        outcome
    }

    /// Post a region-less aggregate as a bare message, without follow-ups.
    pub async fn broadcast(&self, alert: &AggregateAlert) -> Outcome {
        let mut outcome = Outcome::default();
        for result in self.create_posts(alert).await {
            outcome.add(result.is_some());
        }
        info!(
            alert = alert.id(),
            posted = outcome.succeeded,
            failed = outcome.failed,
            "Broadcast alert without regions"
        );
        outcome
    }

    /// Patch every recorded delivery with freshly rendered content.
    ///
    /// Clears the dirty flag before rendering, so changes merged while the
    /// patches are in flight mark the aggregate dirty again.
    pub async fn republish(&self, alert: &AggregateAlert) -> Outcome {
        alert.take_dirty();
        let deliveries = alert.deliveries();
        let mut outcome = Outcome::default();
        if deliveries.is_empty() {
            debug!(alert = alert.id(), "Nothing to patch, no deliveries recorded");
            return outcome;
        }

        let rendered = self.render_all(alert, deliveries.iter().map(|d| d.destination.language));
        let patches = deliveries.iter().filter_map(|delivery| {
            rendered
                .get(&delivery.destination.language)
                .map(|content| self.patch(delivery, content))
        });

        for ok in join_all(patches).await {
            outcome.add(ok);
        }

        debug!(
            alert = alert.id(),
            patched = outcome.succeeded,
            failed = outcome.failed,
            "Republished alert"
        );
        outcome
    }

    async fn create_posts(&self, alert: &AggregateAlert) -> Vec<Option<Delivery>> {
        let rendered = self.render_all(alert, self.destinations.iter().map(|d| d.language));
        let rendered = &rendered;

        let creates = self.destinations.iter().map(|destination| async move {
            let post_id = match rendered.get(&destination.language) {
                Some(content) => self.create(destination, content).await,
                None => None,
            };
            (destination, post_id)
        });

        join_all(creates)
            .await
            .into_iter()
            .map(|(destination, post_id)| {
                let post_id = post_id?;
                let delivery = Delivery {
                    post_id,
                    destination: destination.clone(),
                };
                alert.record_delivery(delivery.clone());
                Some(delivery)
            })
            .collect()
    }

    async fn create(&self, destination: &Destination, content: &RenderedContent) -> Option<PostId> {
        let result = self
            .timed(self.transport.create_post(destination, content))
            .await;
        telemetry::record_post(result.is_ok());
        match result {
            Ok(post_id) => Some(post_id),
            Err(e) => {
                warn!(
                    transport = self.transport.name(),
                    destination = %destination,
                    "Failed to create post: {}",
                    e
                );
                None
            }
        }
    }

    async fn patch(&self, delivery: &Delivery, content: &RenderedContent) -> bool {
        let result = self.timed(self.transport.patch_post(delivery, content)).await;
        telemetry::record_patch(result.is_ok());
        if let Err(e) = &result {
            warn!(
                transport = self.transport.name(),
                destination = %delivery.destination,
                post_id = %delivery.post_id,
                "Failed to patch post: {}",
                e
            );
        }
        result.is_ok()
    }

    async fn react(&self, delivery: &Delivery, marker: &str) {
        if let Err(e) = self.timed(self.transport.add_reaction(delivery, marker)).await {
            telemetry::record_reaction_failed();
            warn!(
                transport = self.transport.name(),
                destination = %delivery.destination,
                post_id = %delivery.post_id,
                marker,
                "Failed to add reaction: {}",
                e
            );
        }
    }

    async fn timed<T, F>(&self, call: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match timeout(self.post_timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(TransportError::Timeout(self.post_timeout)),
        }
    }

    fn spawn_follow_up(&self, alert: Arc<AggregateAlert>, delivery: Delivery) {
        let publisher = self.clone();
        tokio::spawn(async move {
            if let Some(marker) = alert.category().and_then(|c| c.reaction_marker()) {
                publisher.react(&delivery, &marker).await;
            }

            if let Some(delay) = publisher.settle_delay {
                sleep(delay).await;
                let content = publisher
                    .presenter
                    .render(&alert.snapshot(), delivery.destination.language);
                publisher.patch(&delivery, &content).await;
            }
        });
    }
}
