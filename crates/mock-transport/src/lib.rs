//! Mock transport implementations for testing the alert relay.
//!
//! This crate provides implementations of the `Transport` trait for tests:
//! - `RecordingTransport` - Records every operation and the current post state
//! - `FailingTransport` - Wraps another transport and fails chosen destinations
//! - `DelayedTransport` - Wraps another transport with artificial delay
//!
//! For production delivery, use the `broadcaster` crate instead.
//!
//! # Example
//!
//! ```rust
//! use alert_core::{Destination, Language, RenderedContent, Transport};
//! use mock_transport::RecordingTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), alert_core::TransportError> {
//!     let transport = RecordingTransport::new();
//!     let destination = Destination::group("alerts", Language::En);
//!
//!     let post_id = transport.create_post(&destination, &RenderedContent::default()).await?;
//!     assert_eq!(post_id.as_str(), "post-1");
//!     assert_eq!(transport.create_count(), 1);
//!     Ok(())
//! }
//! ```

mod delayed;
mod failing;
mod recording;

// Re-export alert-core types for convenience
pub use alert_core::{async_trait, Delivery, Destination, PostId, RenderedContent, Transport, TransportError};

pub use delayed::DelayedTransport;
pub use failing::FailingTransport;
pub use recording::{RecordingTransport, TransportOp};
