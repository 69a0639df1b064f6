//! Error types for the engine.

use thiserror::Error;

/// Errors that can occur when loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// No destinations were configured.
    #[error("at least one destination must be configured")]
    NoDestinations,
}

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The dispatcher is gone and can no longer accept alerts.
    #[error("alert intake is closed")]
    IntakeClosed,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An engine task panicked or was aborted.
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
