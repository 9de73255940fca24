//! Hub Configuration Settings
//!
//! Configuration types for the hub service, loaded from environment variables.

use std::time::Duration;

use crate::infrastructure::feed::{BackoffConfig, FeedConnectorConfig};

/// Upstream feed API token.
///
/// Wrapped so the token never appears in debug output or logs.
#[derive(Clone)]
pub struct FeedToken(String);

impl FeedToken {
    /// Create a token wrapper.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Get the raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for FeedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FeedToken").field(&"[REDACTED]").finish()
    }
}

/// Upstream feed connection settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Base WebSocket URL without the token query parameter.
    pub url: String,
    /// Handshake timeout.
    pub connect_timeout: Duration,
    /// Pause between consecutive subscribe frames during replay.
    pub subscribe_throttle: Duration,
    /// Backoff delay added per failed reconnect attempt.
    pub reconnect_delay_base: Duration,
    /// Maximum backoff delay.
    pub reconnect_delay_max: Duration,
    /// Cooldown after a rate-limited handshake.
    pub rate_limit_cooldown: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: "wss://ws.finnhub.io".to_string(),
            connect_timeout: Duration::from_secs(10),
            subscribe_throttle: Duration::from_secs(1),
            reconnect_delay_base: Duration::from_secs(5),
            reconnect_delay_max: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port for the SSE stream, symbol management, and health endpoints.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Broadcast channel settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Per-reader buffer capacity of the price-update channel.
    pub price_updates_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            price_updates_capacity: 1_024,
        }
    }
}

/// Complete hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Upstream feed settings.
    pub feed: FeedSettings,
    /// Feed API token.
    pub token: FeedToken,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Broadcast channel settings.
    pub broadcast: BroadcastSettings,
    /// Symbols to start tracking at boot.
    pub seed_symbols: Vec<String>,
}

impl HubConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FEED_TOKEN` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("FEED_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("FEED_TOKEN".to_string()))?;

        if token.is_empty() {
            return Err(ConfigError::EmptyValue("FEED_TOKEN".to_string()));
        }

        let feed = FeedSettings {
            url: std::env::var("FEED_URL").unwrap_or_else(|_| FeedSettings::default().url),
            connect_timeout: parse_env_duration_secs(
                "FEED_CONNECT_TIMEOUT_SECS",
                FeedSettings::default().connect_timeout,
            ),
            subscribe_throttle: parse_env_duration_millis(
                "FEED_SUBSCRIBE_THROTTLE_MS",
                FeedSettings::default().subscribe_throttle,
            ),
            reconnect_delay_base: parse_env_duration_millis(
                "FEED_RECONNECT_DELAY_BASE_MS",
                FeedSettings::default().reconnect_delay_base,
            ),
            reconnect_delay_max: parse_env_duration_millis(
                "FEED_RECONNECT_DELAY_MAX_MS",
                FeedSettings::default().reconnect_delay_max,
            ),
            rate_limit_cooldown: parse_env_duration_secs(
                "FEED_RATE_LIMIT_COOLDOWN_SECS",
                FeedSettings::default().rate_limit_cooldown,
            ),
        };

        let server = ServerSettings {
            http_port: parse_env_u16("HUB_HTTP_PORT", ServerSettings::default().http_port),
        };

        let broadcast = BroadcastSettings {
            price_updates_capacity: parse_env_usize(
                "HUB_PRICE_UPDATES_CAPACITY",
                BroadcastSettings::default().price_updates_capacity,
            ),
        };

        let seed_symbols = std::env::var("HUB_SYMBOLS")
            .map(|raw| parse_symbol_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            feed,
            token: FeedToken::new(token),
            server,
            broadcast,
            seed_symbols,
        })
    }

    /// Get the full WebSocket URL including the token query parameter.
    #[must_use]
    pub fn feed_url(&self) -> String {
        format!("{}?token={}", self.feed.url, self.token.expose())
    }

    /// Build the connector configuration.
    #[must_use]
    pub fn connector_config(&self) -> FeedConnectorConfig {
        FeedConnectorConfig {
            url: self.feed_url(),
            connect_timeout: self.feed.connect_timeout,
            subscribe_throttle: self.feed.subscribe_throttle,
            backoff: BackoffConfig {
                base_delay: self.feed.reconnect_delay_base,
                max_delay: self.feed.reconnect_delay_max,
                rate_limit_cooldown: self.feed.rate_limit_cooldown,
            },
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
