//! Transport trait and a logging implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::{Delivery, PostId};
use crate::content::RenderedContent;
use crate::destination::Destination;
use crate::error::TransportError;

/// Outbound chat-platform operations.
///
/// Abstracted to support different platforms (Signal, tests, etc.). The engine
/// wraps every call in its own timeout, so implementations need not.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a post on a destination.
    ///
    /// # Arguments
    /// * `destination` - Where to post
    /// * `content` - Content rendered in the destination's language
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError>;

    /// Replace the content of an existing post in place.
    ///
    /// Patching with identical content must be harmless.
    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError>;

    /// Attach a reaction marker (e.g. `uav-alert`) to a post.
    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError>;

    /// Name of this transport for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        (**self).create_post(destination, content).await
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        (**self).patch_post(delivery, content).await
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        (**self).add_reaction(delivery, marker).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A transport that only logs, for dry runs.
#[derive(Debug, Default)]
pub struct LoggingTransport {
    next_post: AtomicU64,
}

impl LoggingTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for LoggingTransport {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        let post_id = PostId::new(format!("log-{}", self.next_post.fetch_add(1, Ordering::Relaxed)));
        tracing::info!(
            destination = %destination,
            post_id = %post_id,
            "Create post: {}",
            content.to_plain_text()
        );
        Ok(post_id)
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        tracing::info!(
            destination = %delivery.destination,
            post_id = %delivery.post_id,
            "Patch post: {}",
            content.to_plain_text()
        );
        Ok(())
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        tracing::info!(
            destination = %delivery.destination,
            post_id = %delivery.post_id,
            "React {}",
            marker
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}
