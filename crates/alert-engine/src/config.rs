//! Configuration for the alert engine.

use std::env;
use std::time::Duration;

use alert_core::Destination;

use crate::error::ConfigError;
use crate::table::NovelEvidence;

/// Default maximum number of regions in one post.
pub const DEFAULT_MAX_REGIONS_PER_POST: usize = 20;

/// Default intake queue capacity. One approximates an unbuffered hand-off.
pub const DEFAULT_INTAKE_CAPACITY: usize = 1;

/// Default interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default timeout for every transport call.
pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay before the settle patch of a fresh post.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Configuration for the alert engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Destinations every alert is published to.
    pub destinations: Vec<Destination>,

    /// Aggregates with more regions are split into chunks of this size.
    pub max_regions_per_post: usize,

    /// Capacity of the intake queue. Submitters wait when it is full.
    pub intake_capacity: usize,

    /// Interval between expiry sweeps.
    pub sweep_interval: Duration,

    /// Timeout for each create, patch or reaction call.
    pub post_timeout: Duration,

    /// Delay before re-patching a fresh post. `None` disables the settle patch.
    pub settle_delay: Option<Duration>,

    /// Treatment of candidates carrying evidence a live aggregate lacks.
    pub novel_evidence: NovelEvidence,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            max_regions_per_post: DEFAULT_MAX_REGIONS_PER_POST,
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            post_timeout: DEFAULT_POST_TIMEOUT,
            settle_delay: Some(DEFAULT_SETTLE_DELAY),
            novel_evidence: NovelEvidence::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config with the given destinations and default settings.
    pub fn with_destinations(destinations: Vec<Destination>) -> Self {
        Self {
            destinations,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `ALERT_DESTINATIONS` (comma-separated `<lang>:group:<id>` or `<lang>:<recipient>`)
    ///
    /// Optional env vars:
    /// - `ALERT_MAX_REGIONS_PER_POST` (default: 20)
    /// - `ALERT_INTAKE_CAPACITY` (default: 1)
    /// - `ALERT_SWEEP_INTERVAL_MS` (default: 1000)
    /// - `ALERT_POST_TIMEOUT_SECS` (default: 10)
    /// - `ALERT_SETTLE_DELAY_MS` (default: 200, 0 disables)
    /// - `ALERT_NOVEL_EVIDENCE` (`new` or `merge`, default: new)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        const DESTINATIONS: &str = "ALERT_DESTINATIONS";

        let raw = lookup(DESTINATIONS).ok_or(ConfigError::Missing(DESTINATIONS))?;
        let destinations = parse_destinations(DESTINATIONS, &raw)?;

        let mut config = Self::with_destinations(destinations);

        if let Some(value) = parse_var::<usize, _>(&lookup, "ALERT_MAX_REGIONS_PER_POST")? {
            config.max_regions_per_post = value;
        }
        if let Some(value) = parse_var::<usize, _>(&lookup, "ALERT_INTAKE_CAPACITY")? {
            config.intake_capacity = value;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ALERT_SWEEP_INTERVAL_MS")? {
            config.sweep_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ALERT_POST_TIMEOUT_SECS")? {
            config.post_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "ALERT_SETTLE_DELAY_MS")? {
            config.settle_delay = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(value) = lookup("ALERT_NOVEL_EVIDENCE").filter(|v| !v.trim().is_empty()) {
            config.novel_evidence =
                NovelEvidence::parse(&value).ok_or_else(|| ConfigError::Invalid {
                    key: "ALERT_NOVEL_EVIDENCE",
                    value: value.clone(),
                    reason: "expected 'new' or 'merge'".to_string(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings the engine cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destinations.is_empty() {
            return Err(ConfigError::NoDestinations);
        }
        if self.max_regions_per_post == 0 {
            return Err(ConfigError::Invalid {
                key: "ALERT_MAX_REGIONS_PER_POST",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.post_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "ALERT_POST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "ALERT_SWEEP_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_destinations(key: &'static str, raw: &str) -> Result<Vec<Destination>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<Destination>().map_err(|reason| ConfigError::Invalid {
                key,
                value: entry.to_string(),
                reason,
            })
        })
        .collect()
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            }),
    }
}
