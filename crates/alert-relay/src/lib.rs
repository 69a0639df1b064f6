//! Source adapter for the alert engine.
//!
//! Reads newline-delimited JSON [`RawAlert`] records, resolves their
//! locations through a [`RegionDirectory`], batches them into candidate
//! aggregates and submits those to the engine.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alert_core::{LoggingTransport, RawAlert, RegionDirectory, StaticRegionDirectory, Transport};
use alert_engine::{AlertIntake, EngineError};
use broadcaster::Broadcaster;
use metrics_exporter_prometheus::PrometheusBuilder;
use signal_daemon::{DaemonConfig, DaemonError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// How often the signal-cli daemon is probed once connected.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Errors that stop the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid region directory: {0}")]
    Regions(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Signal error: {0}")]
    Signal(#[from] broadcaster::Error),

    #[error("Daemon configuration error: {0}")]
    Daemon(#[from] DaemonError),

    #[error("Metrics exporter error: {0}")]
    Metrics(String),
}

/// Counters for one pass over the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub lines: usize,
    pub malformed: usize,
    pub submitted: usize,
}

/// Read records until end of input and submit their candidates.
///
/// Blank lines are skipped and malformed lines are logged and skipped.
/// Returns when the input ends or the intake is closed.
pub async fn pump<R>(
    reader: R,
    directory: &dyn RegionDirectory,
    intake: &AlertIntake,
) -> Result<PumpStats, RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = PumpStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        let raw: RawAlert = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                stats.malformed += 1;
                warn!(line = stats.lines, "Skipping malformed alert record: {}", e);
                continue;
            }
        };

        for candidate in raw.to_candidates(directory) {
            match intake.submit(candidate).await {
                Ok(()) => stats.submitted += 1,
                Err(EngineError::IntakeClosed) => {
                    warn!("Intake closed, stopping input");
                    return Ok(stats);
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!(evidence = %raw.evidence_id, "Submitted alert record");
    }

    Ok(stats)
}

/// Load the region directory, or an empty one when no file is given.
pub fn load_directory(path: Option<&Path>) -> Result<StaticRegionDirectory, RelayError> {
    match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            let directory = StaticRegionDirectory::from_json(&data)?;
            info!(path = %path.display(), regions = directory.len(), "Loaded region directory");
            Ok(directory)
        }
        None => {
            warn!("No region directory configured, every location will be dropped");
            Ok(StaticRegionDirectory::default())
        }
    }
}

/// Connect to the signal-cli daemon, or log posts instead on a dry run.
pub async fn connect_transport(dry_run: bool) -> Result<Arc<dyn Transport>, RelayError> {
    if dry_run {
        info!("Dry run, posts are only logged");
        return Ok(Arc::new(LoggingTransport::new()));
    }

    let config = DaemonConfig::from_env()?;
    info!("Connecting to signal-cli daemon at {}", config.base_url);
    let broadcaster = Broadcaster::connect(config).await?;
    broadcaster.client().start_health_monitor(HEALTH_CHECK_INTERVAL);
    Ok(Arc::new(broadcaster))
}

/// Serve Prometheus metrics on `addr`.
pub fn install_metrics(addr: SocketAddr) -> Result<(), RelayError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| RelayError::Metrics(e.to_string()))?;
    alert_engine::telemetry::describe_metrics();
    info!(%addr, "Serving metrics");
    Ok(())
}

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
