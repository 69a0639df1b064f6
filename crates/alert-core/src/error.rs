//! Error types for transport operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a chat destination.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The call did not complete within its deadline.
    #[error("transport call timed out after {0:?}")]
    Timeout(Duration),

    /// The destination refused the operation.
    #[error("rejected by destination: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The post identifier does not belong to this transport.
    #[error("invalid post id: {0}")]
    InvalidPostId(String),
}
