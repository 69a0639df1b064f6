//! Configuration types for signal-daemon.

use std::time::Duration;

use crate::error::DaemonError;

/// Default timeout for a single HTTP request to the daemon.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for connecting to the signal-cli daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Base URL of the daemon HTTP server (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Account phone number for multi-account mode.
    /// If None, assumes single-account mode.
    pub account: Option<String>,
    /// Timeout applied to every HTTP request.
    pub request_timeout: Duration,
}

impl DaemonConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            account: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create configuration with a specific account for multi-account mode.
    pub fn with_account(base_url: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            ..Self::new(base_url)
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `SIGNAL_DAEMON_URL`: daemon base URL (required)
    /// - `SIGNAL_ACCOUNT`: account phone number (optional)
    /// - `SIGNAL_REQUEST_TIMEOUT_SECS`: per-request timeout (optional)
    pub fn from_env() -> Result<Self, DaemonError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DaemonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SIGNAL_DAEMON_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DaemonError::Config("SIGNAL_DAEMON_URL is not set".to_string()))?;

        let mut config = Self::new(base_url.trim());
        config.account = lookup("SIGNAL_ACCOUNT").filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup("SIGNAL_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                DaemonError::Config(format!("SIGNAL_REQUEST_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Get the RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!("{}/api/v1/rpc", self.base_url)
    }

    /// Get the health check endpoint URL.
    pub fn check_url(&self) -> String {
        format!("{}/api/v1/check", self.base_url)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
