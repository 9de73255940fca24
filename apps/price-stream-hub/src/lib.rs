#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Price Stream Hub - Market Data Fan-Out Service
//!
//! Maintains a single connection to an upstream price feed WebSocket and
//! fans the latest prices out to multiple downstream streaming clients.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core price data and subscription state
//!   - `pricing`: Ticks, price records, and the latest-price store
//!   - `registry`: Tracked-symbol set
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the feed connection and the fan-out channel
//!   - `services`: Subscription handling and tick aggregation
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: Upstream WebSocket connector with reconnect/backoff
//!   - `broadcast`: Channel-based price-update distribution
//!   - `config`: Configuration loading from environment variables
//!   - `http`: SSE stream, symbol management, and health endpoints
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Upstream feed WS ──► Aggregator ──┬──► Latest-price store ──► GET /prices
//!                                   │
//!                                   └──► Broadcast channel ──► SSE client 1
//!                                                          ──► SSE client N
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core price and subscription types with no external I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::pricing::{PriceRecord, PriceStore, PriceUpdate, Symbol, Tick};
pub use domain::registry::SubscriptionRegistry;

// Application services and ports
pub use application::ports::{FeedControl, PricePublisher};
pub use application::services::{SubscriptionService, TickAggregator};

// Infrastructure config
pub use infrastructure::config::{
    BroadcastSettings, ConfigError, FeedSettings, FeedToken, HubConfig, ServerSettings,
};

// Feed connector (for integration tests)
pub use infrastructure::feed::{
    ConnectionState, FeedConnector, FeedError, FeedHandle, FeedStatus,
};

// Fan-out channel (for integration tests)
pub use infrastructure::broadcast::{PriceFanout, SharedPriceFanout};

// HTTP server
pub use infrastructure::http::{AppState, HubServer, ServerError};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
