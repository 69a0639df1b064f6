//! Failing transport - fails operations for chosen destinations.

use std::collections::HashSet;

use alert_core::{async_trait, Delivery, Destination, PostId, RenderedContent, Transport, TransportError};

/// A transport that wraps another transport and rejects every operation on
/// selected destinations.
///
/// Useful for testing that one broken destination does not block the rest.
pub struct FailingTransport<T: Transport> {
    inner: T,
    failing: HashSet<String>,
}

impl<T: Transport> FailingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            failing: HashSet::new(),
        }
    }

    /// Fail every operation addressed to the destination with this id.
    pub fn failing(mut self, destination_id: impl Into<String>) -> Self {
        self.failing.insert(destination_id.into());
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn check(&self, destination: &Destination) -> Result<(), TransportError> {
        if self.failing.contains(&destination.id) {
            return Err(TransportError::Rejected(format!("destination {} is failing", destination)));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> Transport for FailingTransport<T> {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        self.check(destination)?;
        self.inner.create_post(destination, content).await
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        self.check(&delivery.destination)?;
        self.inner.patch_post(delivery, content).await
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        self.check(&delivery.destination)?;
        self.inner.add_reaction(delivery, marker).await
    }

    fn name(&self) -> &str {
        "FailingTransport"
    }
}
