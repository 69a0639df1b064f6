use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use alert_core::{RegionDirectory, TextPresenter};
use alert_engine::{AlertEngine, EngineConfig};
use alert_relay::{connect_transport, install_metrics, load_directory, pump};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "alert-relay")]
#[command(about = "Relay newline-delimited JSON alerts from stdin to Signal destinations")]
#[command(version)]
struct Args {
    /// Region directory JSON file
    #[arg(long, env = "ALERT_REGIONS_FILE")]
    regions: Option<PathBuf>,

    /// Address to serve Prometheus metrics on
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Log posts instead of sending them through signal-cli
    #[arg(long, env = "ALERT_DRY_RUN")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Some(addr) = args.metrics_addr {
        install_metrics(addr)?;
    }

    let config = EngineConfig::from_env()?;
    let directory: Arc<dyn RegionDirectory> = Arc::new(load_directory(args.regions.as_deref())?);
    let dry_run = args.dry_run || std::env::var("SIGNAL_DAEMON_URL").is_err();
    let transport = connect_transport(dry_run).await?;
    let presenter = Arc::new(TextPresenter::new(Arc::clone(&directory)));

    let engine = AlertEngine::new(config, transport, presenter)?;
    let cancel = CancellationToken::new();
    let running = engine.start(cancel.clone());
    let intake = running.intake();

    info!("alert-relay {} reading alerts from stdin", alert_relay::version());
    let stdin = BufReader::new(tokio::io::stdin());
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = pump(stdin, directory.as_ref(), &intake) => {
            let stats = result?;
            info!(
                lines = stats.lines,
                malformed = stats.malformed,
                submitted = stats.submitted,
                "End of input"
            );
        }
        _ = interrupted => {
            info!("Interrupted, stopping");
            cancel.cancel();
        }
    }

    drop(intake);
    running.shutdown().await?;
    Ok(())
}
