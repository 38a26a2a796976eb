//! RxGate — session activity gateway for the RxPoint pharmacy platform.
//!
//! Main entry point: configuration, tracing, cache wiring, server startup.

use clap::Parser;
use rx_cache::{ActivityCache, MemoryActivityCache, RedisActivityCache};
use rx_core::config::AppConfig;
use rx_gateway::{AppState, GatewayServer};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rx-gate")]
#[command(about = "Session activity and idle-timeout gateway")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "RX_GATE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "RX_GATE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Inactivity budget in minutes (overrides config)
    #[arg(long, env = "RX_GATE__SESSION__TIMEOUT_MINUTES")]
    timeout_minutes: Option<i64>,

    /// Skip Redis and keep activity entries in process memory
    #[arg(long, default_value_t = false)]
    memory_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rx_gate=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("RxGate starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(minutes) = cli.timeout_minutes {
        config.session.timeout_minutes = minutes;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        timeout_minutes = config.session.timeout_minutes,
        warning_minutes = config.session.warning_minutes,
        "Configuration loaded"
    );

    // The activity cache is best-effort by design: if Redis is not there,
    // bearer callers fall back to the in-process store on this node.
    let cache: Arc<dyn ActivityCache> = if cli.memory_cache {
        info!("Using in-process activity cache");
        Arc::new(MemoryActivityCache::new())
    } else {
        match RedisActivityCache::new(&config.redis).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-process activity cache");
                Arc::new(MemoryActivityCache::new())
            }
        }
    };

    let state = AppState::new(&config, cache);
    let server = GatewayServer::new(config, state);

    if let Err(e) = server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("RxGate is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    server.start_http().await?;

    Ok(())
}
