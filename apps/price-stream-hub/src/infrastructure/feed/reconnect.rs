//! Reconnection Policy
//!
//! Linear backoff for feed reconnection. Each failed attempt adds one base
//! delay up to a cap, and a rate-limited handshake overrides the next delay
//! with a longer fixed cooldown.

use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay added per failed attempt.
    pub base_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Cooldown applied after the upstream rate-limits the handshake.
    pub rate_limit_cooldown: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }
}

/// Reconnection policy implementing linear backoff with a rate-limit cooldown.
///
/// Reconnection never gives up: the delay grows linearly per attempt and
/// saturates at the configured cap.
#[derive(Debug)]
pub struct BackoffPolicy {
    config: BackoffConfig,
    attempt_count: u32,
    rate_limited: bool,
}

impl BackoffPolicy {
    /// Create a new policy.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempt_count: 0,
            rate_limited: false,
        }
    }

    /// Get the delay to wait before the next attempt.
    ///
    /// After [`Self::mark_rate_limited`] the next delay is the configured
    /// cooldown instead of the linear schedule, and the attempt counter is
    /// left untouched.
    #[must_use]
    pub fn next_delay(&mut self) -> Duration {
        if self.rate_limited {
            self.rate_limited = false;
            return self.config.rate_limit_cooldown;
        }

        let scaled = self
            .config
            .base_delay
            .saturating_mul(self.attempt_count.saturating_add(1));
        self.attempt_count = self.attempt_count.saturating_add(1);

        scaled.min(self.config.max_delay)
    }

    /// Override the next delay with the rate-limit cooldown.
    pub const fn mark_rate_limited(&mut self) {
        self.rate_limited = true;
    }

    /// Reset the policy after a successful connection.
    pub const fn reset(&mut self) {
        self.attempt_count = 0;
        self.rate_limited = false;
    }

    /// Get the current attempt count.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}
