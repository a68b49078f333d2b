use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wsbridge::adapters::hyper_server::serve;
use wsbridge::adapters::{ConnectionTracker, HyperBridgeAdapter, TcpConnector};
use wsbridge::config::BridgeConfig;
use wsbridge::domain::{BridgeService, Relay};
use wsbridge::ports::TrackingPort;

#[derive(Parser, Debug)]
#[clap(version = env!("WSBRIDGE_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// Configuration file (defaults to the platform config directory)
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// listen on this network adress
    #[clap(long, short = 'b')]
    bind: Option<String>,

    /// path of the WebSocket upgrade endpoint
    #[clap(long, short = 'p')]
    path: Option<String>,

    /// timeout for outbound TCP connections, in milliseconds
    #[clap(long)]
    connect_timeout_ms: Option<u64>,

    /// default log filter, overridden by RUST_LOG
    #[clap(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opts.log_level)))
        .init();

    let mut config = BridgeConfig::load(opts.config.as_deref())?;
    if let Some(bind) = opts.bind {
        config.bind = bind;
    }
    if let Some(path) = opts.path {
        config.path = path;
    }
    if let Some(timeout) = opts.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }
    config.validate()?;

    match rlimit::increase_nofile_limit(u64::MAX) {
        Ok(limit) => info!("open file limit set to {}", limit),
        Err(e) => warn!("failed to raise open file limit: {}", e),
    }

    let tracker = Arc::new(ConnectionTracker::new());
    tracker.start_cleanup();
    let tracker_port: Arc<dyn TrackingPort> = tracker;

    let connector = Arc::new(TcpConnector::new(config.connect_timeout()));
    let service = Arc::new(BridgeService::new(connector, tracker_port).with_path(config.path.clone()));
    let adapter = Arc::new(HyperBridgeAdapter::new(service, Relay::new(config.relay_settings())));

    let listener = TcpListener::bind(&config.bind).await?;
    info!(
        "wsbridge {} listening on ws://{}{}",
        env!("WSBRIDGE_VERSION"),
        listener.local_addr()?,
        config.path
    );

    serve(listener, adapter).await;
    Ok(())
}
