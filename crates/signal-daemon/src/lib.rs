//! Signal-cli daemon client library.
//!
//! A small JSON-RPC client for the signal-cli daemon HTTP server, covering
//! what an outbound publisher needs:
//!
//! - Sending messages to individuals and groups
//! - Editing previously sent messages in place
//! - Reacting to sent messages
//! - Health checking
//!
//! # Example
//!
//! ```no_run
//! use signal_daemon::{DaemonConfig, SendTarget, SignalClient};
//!
//! # async fn example() -> Result<(), signal_daemon::DaemonError> {
//! let config = DaemonConfig::with_account("http://localhost:8080", "+1234567890");
//! let client = SignalClient::connect(config).await?;
//!
//! let target = SendTarget::group("group-id");
//! let sent = client.send_to(&target, "Rocket and missile fire").await?;
//! client
//!     .send_edit(&target, sent.timestamp, "Rocket and missile fire (2)")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::SignalClient;
pub use config::DaemonConfig;
pub use error::DaemonError;
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
