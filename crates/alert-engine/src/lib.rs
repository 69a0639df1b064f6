//! Alert correlation, merge and lifecycle engine.
//!
//! Source adapters submit candidate aggregates through an [`AlertIntake`].
//! A single [`Dispatcher`] drains the queue: it splits oversized candidates,
//! correlates each chunk against the live aggregates in the
//! [`CorrelationTable`], patches aggregates that learned something new and
//! publishes candidates that cover new regions. A [`Sweeper`] flushes pending
//! changes and evicts expired aggregates in the background.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use alert_core::{AggregateAlert, AlertEvent, Category, Destination, Language, LoggingTransport, TextPresenter};
//! use alert_engine::{AlertEngine, EngineConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), alert_engine::EngineError> {
//!     let config = EngineConfig::with_destinations(vec![Destination::group("alerts", Language::En)]);
//!     let engine = AlertEngine::new(
//!         config,
//!         Arc::new(LoggingTransport::new()),
//!         Arc::new(TextPresenter::default()),
//!     )?;
//!
//!     let running = engine.start(CancellationToken::new());
//!     let event = AlertEvent::new(Category::Rockets, "R1", "ev1");
//!     running.intake().submit(AggregateAlert::from_event(&event)).await?;
//!
//!     running.shutdown().await
//! }
//! ```

mod config;
mod dispatcher;
mod engine;
mod error;
mod intake;
mod publisher;
mod sweeper;
mod table;
pub mod telemetry;

pub use config::{
    EngineConfig, DEFAULT_INTAKE_CAPACITY, DEFAULT_MAX_REGIONS_PER_POST, DEFAULT_POST_TIMEOUT,
    DEFAULT_SETTLE_DELAY, DEFAULT_SWEEP_INTERVAL,
};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use engine::{AlertEngine, RunningEngine};
pub use error::{ConfigError, EngineError};
pub use intake::{intake, AlertIntake, IntakeReceiver};
pub use publisher::{Outcome, Publisher};
pub use sweeper::{SweepReport, Sweeper};
pub use table::{Correlation, CorrelationTable, NovelEvidence};
