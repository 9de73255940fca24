//! HTTP Server
//!
//! The downstream surface of the hub: SSE price streaming, symbol
//! management, latest-price reads, and health probes.
//!
//! # Endpoints
//!
//! - `GET /stream` - Server-sent events stream of price updates
//! - `PUT /symbols/{symbol}` - Start tracking a symbol
//! - `DELETE /symbols/{symbol}` - Stop tracking a symbol
//! - `GET /symbols` - List tracked symbols
//! - `GET /prices/{symbol}` - Latest known price for a symbol
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks the feed connection)

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;

use crate::application::services::SubscriptionService;
use crate::domain::pricing::PriceStore;
use crate::infrastructure::broadcast::SharedPriceFanout;
use crate::infrastructure::feed::{ConnectionState, FeedStatus};

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded".
    pub status: HealthStatus,
    /// Hub version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream feed status.
    pub feed: FeedInfo,
    /// Number of attached SSE stream clients.
    pub stream_clients: usize,
    /// Number of tracked symbols.
    pub tracked_symbols: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Feed connected, updates flowing.
    Healthy,
    /// Feed down; cached prices still served while the connector retries.
    Degraded,
}

/// Upstream feed status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Connection state.
    pub state: ConnectionState,
    /// Whether the feed is connected.
    pub connected: bool,
    /// Sessions established since startup.
    pub connects: u64,
    /// Ticks received since startup.
    pub ticks_received: u64,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the HTTP server.
pub struct AppState {
    version: String,
    started_at: Instant,
    subscriptions: Arc<SubscriptionService>,
    store: Arc<PriceStore>,
    fanout: SharedPriceFanout,
    feed_status: Arc<FeedStatus>,
}

impl AppState {
    /// Create new server state.
    #[must_use]
    pub fn new(
        subscriptions: Arc<SubscriptionService>,
        store: Arc<PriceStore>,
        fanout: SharedPriceFanout,
        feed_status: Arc<FeedStatus>,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            subscriptions,
            store,
            fanout,
            feed_status,
        }
    }
}

/// Build the hub router over the shared state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/stream", get(stream_handler))
        .route("/symbols", get(list_symbols_handler))
        .route(
            "/symbols/{symbol}",
            put(track_symbol_handler).delete(untrack_symbol_handler),
        )
        .route("/prices/{symbol}", get(price_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .with_state(state)
}

// =============================================================================
// Hub Server
// =============================================================================

/// Hub HTTP server.
pub struct HubServer {
    port: u16,
    state: Arc<AppState>,
    cancel: CancellationToken,
}

impl HubServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<AppState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server encounters
    /// a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Hub server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Hub server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn stream_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.fanout.attach();
    tracing::debug!(clients = state.fanout.receiver_count(), "SSE client attached");

    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(update) => match serde_json::to_string(&update) {
            Ok(json) => Some(Ok(Event::default().data(json))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize price update");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            // Slow client: its oldest updates are gone, the stream continues
            // from the newest retained one.
            tracing::warn!(skipped, "SSE client lagged, updates dropped");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn track_symbol_handler(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> StatusCode {
    state.subscriptions.add(&symbol);
    StatusCode::NO_CONTENT
}

async fn untrack_symbol_handler(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> StatusCode {
    state.subscriptions.remove(&symbol);
    StatusCode::NO_CONTENT
}

async fn list_symbols_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut symbols = state.subscriptions.snapshot();
    symbols.sort();
    Json(symbols)
}

async fn price_handler(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    state.store.get(&symbol).map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |record| Json(record).into_response(),
    )
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(build_health_response(&state))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.feed_status.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let connection_state = state.feed_status.state();
    let connected = connection_state == ConnectionState::Connected;

    let status = if connected {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed: FeedInfo {
            state: connection_state,
            connected,
            connects: state.feed_status.connect_count(),
            ticks_received: state.feed_status.ticks_received(),
        },
        stream_clients: state.fanout.receiver_count(),
        tracked_symbols: state.subscriptions.snapshot().len(),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Hub server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
