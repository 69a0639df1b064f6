//! Signal transport for published alerts.
//!
//! [`Broadcaster`] implements [`alert_core::Transport`] on top of the
//! signal-cli daemon: posts are plain messages, patches are message edits
//! and reaction markers become emoji reactions. A post id is the sent
//! timestamp reported by the daemon.
//!
//! # Example
//!
//! ```no_run
//! use broadcaster::Broadcaster;
//! use signal_daemon::DaemonConfig;
//!
//! # async fn example() -> Result<(), broadcaster::Error> {
//! let config = DaemonConfig::with_account("http://localhost:8080", "+1234567890");
//! let broadcaster = Broadcaster::connect(config).await?;
//! assert_eq!(broadcaster.author(), "+1234567890");
//! # Ok(())
//! # }
//! ```

use alert_core::{
    async_trait, Delivery, Destination, PostId, RenderedContent, Transport, TransportError,
};
use signal_daemon::{DaemonConfig, DaemonError, ReactionParams, SendTarget, SignalClient};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while setting up a broadcaster.
#[derive(Debug, Error)]
pub enum Error {
    /// Daemon communication error.
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),
}

/// Publishes alert posts through the signal-cli daemon.
#[derive(Clone, Debug)]
pub struct Broadcaster {
    client: SignalClient,
    author: String,
}

impl Broadcaster {
    /// Connect to the signal-cli daemon and create a broadcaster.
    ///
    /// Reactions target posts authored by this account, so the account number
    /// is read from the configuration or asked from the daemon.
    pub async fn connect(config: DaemonConfig) -> Result<Self, Error> {
        let client = SignalClient::connect(config).await?;
        let author = match client.account() {
            Some(account) => account.to_string(),
            None => client.get_self_number().await?,
        };
        info!(author = %author, "Broadcaster connected to daemon");
        Ok(Self { client, author })
    }

    /// Wrap an existing client whose sending account is known.
    pub fn with_client(client: SignalClient, author: impl Into<String>) -> Self {
        Self {
            client,
            author: author.into(),
        }
    }

    /// Account number the posts are sent from.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Get the underlying SignalClient.
    pub fn client(&self) -> &SignalClient {
        &self.client
    }

    /// Check if the broadcaster is connected to the daemon.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }
}

#[async_trait]
impl Transport for Broadcaster {
    async fn create_post(
        &self,
        destination: &Destination,
        content: &RenderedContent,
    ) -> Result<PostId, TransportError> {
        let target = target_for(destination);
        let sent = self
            .client
            .send_to(&target, &message_text(content))
            .await
            .map_err(transport_error)?;
        debug!(target = %target, timestamp = sent.timestamp, "Created post");
        Ok(PostId::new(sent.timestamp.to_string()))
    }

    async fn patch_post(
        &self,
        delivery: &Delivery,
        content: &RenderedContent,
    ) -> Result<(), TransportError> {
        let timestamp = sent_timestamp(&delivery.post_id)?;
        let target = target_for(&delivery.destination);
        self.client
            .send_edit(&target, timestamp, &message_text(content))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn add_reaction(&self, delivery: &Delivery, marker: &str) -> Result<(), TransportError> {
        let timestamp = sent_timestamp(&delivery.post_id)?;
        let target = target_for(&delivery.destination);
        let params = ReactionParams::new(&target, reaction_emoji(marker), &self.author, timestamp);
        self.client.send_reaction(params).await.map_err(transport_error)
    }

    fn name(&self) -> &str {
        "signal"
    }
}

/// Map a destination onto a recipient or group target.
pub fn target_for(destination: &Destination) -> SendTarget {
    if destination.is_group {
        SendTarget::group(destination.id.clone())
    } else {
        SendTarget::recipient(destination.id.clone())
    }
}

/// Message body sent for rendered content.
pub fn message_text(content: &RenderedContent) -> String {
    content.to_plain_text()
}

/// Emoji used for a reaction marker.
pub fn reaction_emoji(marker: &str) -> &'static str {
    match marker {
        "uav-alert" => "✈️",
        "infiltration-alert" => "🚨",
        _ => "⚠️",
    }
}

fn sent_timestamp(post_id: &PostId) -> Result<u64, TransportError> {
    post_id
        .as_str()
        .parse()
        .map_err(|_| TransportError::InvalidPostId(post_id.as_str().to_string()))
}

fn transport_error(err: DaemonError) -> TransportError {
    if err.is_unavailable() {
        TransportError::Unavailable(err.to_string())
    } else {
        TransportError::Rejected(err.to_string())
    }
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
