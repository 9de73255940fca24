//! Subscription Service
//!
//! The collaborator-facing entry point for tracking symbols. Position
//! create/delete in the (external) CRUD layer calls [`SubscriptionService::add`]
//! and [`SubscriptionService::remove`]; the feed connector reads the registry
//! snapshot when it (re)connects.

use std::sync::Arc;

use crate::application::ports::FeedControl;
use crate::domain::pricing::Symbol;
use crate::domain::registry::SubscriptionRegistry;

/// Tracks symbols and keeps the live upstream connection in sync.
///
/// All operations are total and non-blocking. Wire I/O is requested through
/// the [`FeedControl`] port and is best-effort: a failed request does not
/// roll back registry membership, because the connector re-derives its
/// subscriptions from the registry snapshot on every successful connect.
pub struct SubscriptionService {
    registry: Arc<SubscriptionRegistry>,
    feed: Arc<dyn FeedControl>,
}

impl SubscriptionService {
    /// Create a service over the shared registry and feed handle.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>, feed: Arc<dyn FeedControl>) -> Self {
        Self { registry, feed }
    }

    /// Start tracking a symbol.
    ///
    /// Idempotent: adding an already-tracked symbol is a no-op and sends
    /// nothing upstream. While the feed is connected, a net-new symbol
    /// triggers exactly one immediate wire subscribe; otherwise it is picked
    /// up on the next successful connect.
    pub fn add(&self, symbol: &str) {
        if !self.registry.insert(symbol) {
            return;
        }

        tracing::debug!(symbol, "Tracking symbol");

        if self.feed.is_connected() {
            self.feed.request_subscribe(symbol);
        }
    }

    /// Stop tracking a symbol.
    ///
    /// Idempotent: always removes the symbol from the set regardless of
    /// connection state. While connected, a wire unsubscribe is requested;
    /// duplicates are harmless upstream.
    pub fn remove(&self, symbol: &str) {
        if self.feed.is_connected() {
            self.feed.request_unsubscribe(symbol);
        }

        if self.registry.discard(symbol) {
            tracing::debug!(symbol, "Stopped tracking symbol");
        }
    }

    /// Current tracked-symbol snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Symbol> {
        self.registry.snapshot()
    }
}

// =============================================================================
// Tests
// =============================================================================
