//! Price Stream Hub Binary
//!
//! Starts the price ingestion and fan-out service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-stream-hub
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_TOKEN`: Upstream feed API token
//!
//! ## Optional
//! - `FEED_URL`: Upstream WebSocket URL (default: wss://ws.finnhub.io)
//! - `FEED_CONNECT_TIMEOUT_SECS`: Handshake timeout (default: 10)
//! - `FEED_SUBSCRIBE_THROTTLE_MS`: Pause between subscribe frames (default: 1000)
//! - `FEED_RECONNECT_DELAY_BASE_MS`: Backoff step per failed attempt (default: 5000)
//! - `FEED_RECONNECT_DELAY_MAX_MS`: Backoff cap (default: 30000)
//! - `FEED_RATE_LIMIT_COOLDOWN_SECS`: Delay after a 429 (default: 60)
//! - `HUB_HTTP_PORT`: HTTP server port (default: 8080)
//! - `HUB_PRICE_UPDATES_CAPACITY`: Fan-out buffer per client (default: 1024)
//! - `HUB_SYMBOLS`: Comma-separated symbols to track at boot
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use price_stream_hub::infrastructure::telemetry;
use price_stream_hub::{
    AppState, FeedConnector, HubConfig, HubServer, PriceFanout, PriceStore, SubscriptionRegistry,
    SubscriptionService, TickAggregator,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Price Stream Hub");

    let config = HubConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Shared domain state
    let registry = Arc::new(SubscriptionRegistry::new());
    let store = Arc::new(PriceStore::new());
    let fanout = Arc::new(PriceFanout::new(config.broadcast.price_updates_capacity));

    // Aggregator between the feed and the store/fan-out pair
    let aggregator = Arc::new(TickAggregator::new(
        Arc::clone(&store),
        Arc::clone(&fanout) as _,
    ));

    // Feed connector and its shared handle
    let (connector, feed_handle) = FeedConnector::new(
        config.connector_config(),
        Arc::clone(&registry),
        aggregator,
        shutdown_token.clone(),
    );
    let feed_status = feed_handle.status();

    // Subscription service drives the registry and the live connection
    let subscriptions = Arc::new(SubscriptionService::new(
        Arc::clone(&registry),
        Arc::new(feed_handle) as _,
    ));

    // Seed symbols before the first connect so the replay picks them up
    for symbol in &config.seed_symbols {
        subscriptions.add(symbol);
    }

    // HTTP server state
    let app_state = Arc::new(AppState::new(
        Arc::clone(&subscriptions),
        store,
        fanout,
        feed_status,
    ));
    let server = HubServer::new(
        config.server.http_port,
        app_state,
        shutdown_token.clone(),
    );

    // Spawn the feed connector
    tokio::spawn(connector.run());

    // Spawn the HTTP server
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Hub server error");
        }
    });

    tracing::info!("Price stream hub ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Price stream hub stopped");
    Ok(())
}

/// Log the parsed configuration. The token never appears here.
fn log_config(config: &HubConfig) {
    tracing::info!(
        feed_url = %config.feed.url,
        http_port = config.server.http_port,
        price_updates_capacity = config.broadcast.price_updates_capacity,
        seed_symbols = config.seed_symbols.len(),
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
