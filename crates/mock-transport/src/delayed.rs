//! Delayed transport - wraps another transport with artificial delay.

use std::time::Duration;

use alert_core::{async_trait, Delivery, Destination, PostId, RenderedContent, Transport, TransportError};
use tokio::time::sleep;

/// A transport that wraps another transport and sleeps before every call.
///
/// Useful for testing timeout handling and slow destinations.
pub struct DelayedTransport<T: Transport> {
    inner: T,
    delay: Duration,
}

impl<T: Transport> DelayedTransport<T> {
    pub fn new(inner: T, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn with_millis(inner: T, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn with_secs(inner: T, secs: u64) -> Self {
        Self::new(inner, Duration::from_secs(secs))
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for DelayedTransport<T> {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        sleep(self.delay).await;
        self.inner.create_post(destination, content).await
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        sleep(self.delay).await;
        self.inner.patch_post(delivery, content).await
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        sleep(self.delay).await;
        self.inner.add_reaction(delivery, marker).await
    }

    fn name(&self) -> &str {
        "DelayedTransport"
    }
}
