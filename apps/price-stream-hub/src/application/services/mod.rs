//! Application Services
//!
//! Services that orchestrate domain state and the feed/fan-out ports.
//!
//! - [`SubscriptionService`]: collaborator-facing add/remove of tracked
//!   symbols, with immediate wire subscribes while the feed is connected
//! - [`TickAggregator`]: reduces raw tick batches and drives the
//!   store-write-then-publish step

mod aggregator;
mod subscriptions;

pub use aggregator::TickAggregator;
pub use subscriptions::SubscriptionService;
