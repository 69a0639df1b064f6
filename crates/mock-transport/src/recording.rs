//! Recording transport - keeps a log of every operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alert_core::{async_trait, Delivery, Destination, PostId, RenderedContent, Transport, TransportError};
use parking_lot::Mutex;

/// One operation performed against a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOp {
    Create {
        destination: Destination,
        post_id: PostId,
        content: RenderedContent,
    },
    Patch {
        destination: Destination,
        post_id: PostId,
        content: RenderedContent,
    },
    React {
        destination: Destination,
        post_id: PostId,
        marker: String,
    },
}

impl TransportOp {
    pub fn post_id(&self) -> &PostId {
        match self {
            TransportOp::Create { post_id, .. }
            | TransportOp::Patch { post_id, .. }
            | TransportOp::React { post_id, .. } => post_id,
        }
    }

    pub fn destination(&self) -> &Destination {
        match self {
            TransportOp::Create { destination, .. }
            | TransportOp::Patch { destination, .. }
            | TransportOp::React { destination, .. } => destination,
        }
    }
}

/// A transport that records operations and keeps the latest content per post.
///
/// Post ids are `post-1`, `post-2`, ... in creation order.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    ops: Mutex<Vec<TransportOp>>,
    posts: Mutex<HashMap<PostId, RenderedContent>>,
    next_post: AtomicU64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the operation log.
    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().clone()
    }

    pub fn creates(&self) -> Vec<TransportOp> {
        self.filtered(|op| matches!(op, TransportOp::Create { .. }))
    }

    pub fn patches(&self) -> Vec<TransportOp> {
        self.filtered(|op| matches!(op, TransportOp::Patch { .. }))
    }

    pub fn reactions(&self) -> Vec<TransportOp> {
        self.filtered(|op| matches!(op, TransportOp::React { .. }))
    }

    pub fn create_count(&self) -> usize {
        self.creates().len()
    }

    pub fn patch_count(&self) -> usize {
        self.patches().len()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions().len()
    }

    /// Patches applied to one post.
    pub fn patches_for(&self, post_id: &PostId) -> Vec<TransportOp> {
        self.filtered(|op| matches!(op, TransportOp::Patch { .. }) && op.post_id() == post_id)
    }

    /// Current content of a post.
    pub fn post(&self, post_id: &PostId) -> Option<RenderedContent> {
        self.posts.lock().get(post_id).cloned()
    }

    fn filtered(&self, keep: impl Fn(&TransportOp) -> bool) -> Vec<TransportOp> {
        self.ops.lock().iter().filter(|op| keep(op)).cloned().collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        let post_id = PostId::new(format!("post-{}", self.next_post.fetch_add(1, Ordering::SeqCst) + 1));
        self.posts.lock().insert(post_id.clone(), content.clone());
        self.ops.lock().push(TransportOp::Create {
            destination: destination.clone(),
            post_id: post_id.clone(),
            content: content.clone(),
        });
        Ok(post_id)
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        {
            let mut posts = self.posts.lock();
            match posts.get_mut(&delivery.post_id) {
                Some(post) => *post = content.clone(),
                None => return Err(TransportError::InvalidPostId(delivery.post_id.to_string())),
            }
        }
        self.ops.lock().push(TransportOp::Patch {
            destination: delivery.destination.clone(),
            post_id: delivery.post_id.clone(),
            content: content.clone(),
        });
        Ok(())
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        if !self.posts.lock().contains_key(&delivery.post_id) {
            return Err(TransportError::InvalidPostId(delivery.post_id.to_string()));
        }
        self.ops.lock().push(TransportOp::React {
            destination: delivery.destination.clone(),
            post_id: delivery.post_id.clone(),
            marker: marker.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "RecordingTransport"
    }
}
