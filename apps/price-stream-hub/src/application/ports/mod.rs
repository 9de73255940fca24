//! Port Interfaces
//!
//! Interfaces (ports) for the external systems the application services
//! drive, following the Hexagonal Architecture pattern. Infrastructure
//! adapters implement these; tests substitute doubles.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`FeedControl`]: control surface of the upstream feed connection
//! - [`PricePublisher`]: publish side of the price-update fan-out channel

use crate::domain::pricing::PriceUpdate;

/// Control surface of the upstream feed connection.
///
/// Implemented by the feed connector's handle. Subscribe/unsubscribe
/// requests are fire-and-forget: they must never block the caller, and a
/// failed request is logged by the implementation rather than surfaced
/// (membership reconciles on the next reconnect cycle).
pub trait FeedControl: Send + Sync {
    /// Whether the upstream connection is currently established.
    fn is_connected(&self) -> bool;

    /// Request a wire-level subscribe for the symbol.
    fn request_subscribe(&self, symbol: &str);

    /// Request a wire-level unsubscribe for the symbol.
    fn request_unsubscribe(&self, symbol: &str);
}

/// Publish side of the price-update fan-out channel.
pub trait PricePublisher: Send + Sync {
    /// Deliver an update to every attached reader.
    ///
    /// Returns the number of readers that received it, or `None` when no
    /// reader is attached (which is success, not an error).
    fn publish(&self, update: PriceUpdate) -> Option<usize>;
}
