//! Error types for signal-daemon.

use thiserror::Error;

/// Errors that can occur when interacting with the signal-cli daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON-RPC error response from daemon.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Connection to daemon failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Daemon health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The daemon accepted the request but delivery failed for every recipient.
    #[error("Send failed: {0}")]
    SendFailed(String),
}

impl DaemonError {
    /// Whether the daemon could not be reached at all, as opposed to
    /// rejecting the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DaemonError::Http(_) | DaemonError::Connection(_) | DaemonError::HealthCheckFailed
        )
    }
}
