//! Broadcast Channel Adapter
//!
//! Fans price updates out to every attached reader using a tokio broadcast
//! channel. Delivery is per-reader: a slow reader that overruns the channel
//! capacity loses its own oldest updates without affecting other readers or
//! the publishing side.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::application::ports::PricePublisher;
use crate::domain::pricing::PriceUpdate;

/// Default channel capacity when none is configured.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Price-update fan-out channel.
///
/// Readers attach by calling [`PriceFanout::attach`] and receive only
/// updates published after attachment.
#[derive(Debug)]
pub struct PriceFanout {
    updates_tx: broadcast::Sender<PriceUpdate>,
}

impl Default for PriceFanout {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PriceFanout {
    /// Create a fan-out channel with the given per-reader buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            updates_tx: broadcast::channel(capacity).0,
        }
    }

    /// Attach a new reader.
    ///
    /// The reader observes updates published from this point on. Dropping
    /// the receiver detaches it.
    #[must_use]
    pub fn attach(&self) -> broadcast::Receiver<PriceUpdate> {
        self.updates_tx.subscribe()
    }

    /// Send an update to all attached readers.
    ///
    /// Returns the number of readers that received it, or `None` if no
    /// reader is attached.
    #[must_use]
    pub fn send(&self, update: PriceUpdate) -> Option<usize> {
        self.updates_tx.send(update).ok()
    }

    /// Number of currently attached readers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.updates_tx.receiver_count()
    }
}

impl PricePublisher for PriceFanout {
    fn publish(&self, update: PriceUpdate) -> Option<usize> {
        self.send(update)
    }
}

/// Shared fan-out reference.
pub type SharedPriceFanout = Arc<PriceFanout>;

// =============================================================================
// Tests
// =============================================================================
