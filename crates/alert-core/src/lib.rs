//! Core types and collaborator traits for the alert relay.
//!
//! This crate provides the shared vocabulary used by the correlation engine
//! and its collaborators. It defines:
//!
//! - [`AlertEvent`] - a single per-region record produced by a source adapter
//! - [`AggregateAlert`] - the mergeable, in-flight notification covering regions
//! - [`batch_events`] - groups one ingestion pass into candidate aggregates
//! - [`Transport`] - create/patch/react against a chat destination
//! - [`Presenter`] / [`TextPresenter`] - localized rendering of an aggregate
//! - [`RegionDirectory`] / [`StaticRegionDirectory`] - name to region lookups
//!
//! # Example
//!
//! ```rust
//! use alert_core::{batch_events, AlertEvent, Category};
//!
//! let events = vec![
//!     AlertEvent::new(Category::Rockets, "R1", "ev1").with_safety_seconds(90),
//!     AlertEvent::new(Category::Rockets, "R2", "ev1").with_safety_seconds(90),
//! ];
//!
//! let candidates = batch_events(&events);
//! assert_eq!(candidates.len(), 1);
//! assert_eq!(candidates[0].region_count(), 2);
//! ```

mod alert;
mod batch;
mod content;
mod destination;
mod error;
mod event;
mod presenter;
mod regions;
mod transport;

pub use alert::{AggregateAlert, AlertSnapshot, Delivery, PostId, MIN_ALERT_TTL};
pub use batch::{batch_events, RawAlert};
pub use content::{ContentField, Priority, RenderedContent};
pub use destination::{Destination, Language};
pub use error::TransportError;
pub use event::{AlertEvent, Category, EvidenceId, RegionId};
pub use presenter::{Presenter, TextPresenter};
pub use regions::{normalize_region_name, RegionDirectory, RegionName, RegionRecord, StaticRegionDirectory};
pub use transport::{LoggingTransport, Transport};

// Re-export async_trait for transport implementations
pub use async_trait::async_trait;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
