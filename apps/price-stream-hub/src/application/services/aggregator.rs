//! Tick Aggregator
//!
//! Reduces each raw tick batch from the upstream feed to at most one update
//! per symbol (last tick in the batch wins), stamps it with ingestion time,
//! writes the latest-price store, then publishes to the fan-out channel.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::PricePublisher;
use crate::domain::pricing::{PriceRecord, PriceStore, PriceUpdate, Symbol, Tick};

/// Batch reducer between the feed connector and the store/fan-out pair.
///
/// Stateless across batches; all retained state lives in the store.
pub struct TickAggregator {
    store: Arc<PriceStore>,
    publisher: Arc<dyn PricePublisher>,
}

impl TickAggregator {
    /// Create an aggregator over the shared store and fan-out publisher.
    #[must_use]
    pub fn new(store: Arc<PriceStore>, publisher: Arc<dyn PricePublisher>) -> Self {
        Self { store, publisher }
    }

    /// Process one batch of raw ticks.
    ///
    /// An empty batch is a no-op. For each symbol the store is written
    /// before the update is published, so a reader woken by the update
    /// always observes a store at least as fresh as the update it received.
    pub fn handle(&self, ticks: &[Tick]) {
        if ticks.is_empty() {
            return;
        }

        let timestamp = chrono::Utc::now().timestamp_millis();

        for (symbol, price) in reduce_last_per_symbol(ticks) {
            let record = PriceRecord {
                symbol,
                price,
                timestamp,
            };

            tracing::trace!(symbol = %record.symbol, price = %record.price, "Price update");

            self.store.write(record.clone());
            self.publisher.publish(PriceUpdate::from(record));
        }
    }
}

/// Collapse a batch to its last price per symbol, preserving the order in
/// which each symbol first appears.
fn reduce_last_per_symbol(ticks: &[Tick]) -> Vec<(Symbol, Decimal)> {
    let mut reduced: Vec<(Symbol, Decimal)> = Vec::new();

    for tick in ticks {
        match reduced.iter_mut().find(|(symbol, _)| *symbol == tick.symbol) {
            Some((_, price)) => *price = tick.price,
            None => reduced.push((tick.symbol.clone(), tick.price)),
        }
    }

    reduced
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    use super::*;

    #[derive(Default)]
    struct RecordingPublisher {
        updates: Mutex<Vec<PriceUpdate>>,
    }

    impl PricePublisher for RecordingPublisher {
        fn publish(&self, update: PriceUpdate) -> Option<usize> {
            self.updates.lock().push(update);
            None
        }
    }

    fn aggregator() -> (TickAggregator, Arc<PriceStore>, Arc<RecordingPublisher>) {
        let store = Arc::new(PriceStore::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let aggregator = TickAggregator::new(Arc::clone(&store), Arc::clone(&publisher) as _);
        (aggregator, store, publisher)
    }

    fn tick(symbol: &str, price: Decimal) -> Tick {
        Tick {
            symbol: symbol.to_string(),
            price,
            timestamp: 0,
            volume: None,
        }
    }

    #[test]
    fn empty_batch_is_noop() {
        let (aggregator, store, publisher) = aggregator();

        aggregator.handle(&[]);

        assert!(store.is_empty());
        assert!(publisher.updates.lock().is_empty());
    }

    #[test]
    fn last_tick_per_symbol_wins() {
        let (aggregator, store, publisher) = aggregator();

        aggregator.handle(&[
            tick("A", dec!(10)),
            tick("B", dec!(20)),
            tick("A", dec!(12)),
        ]);

        let a = store.get("A").unwrap();
        let b = store.get("B").unwrap();
        assert_eq!(a.price, dec!(12));
        assert_eq!(b.price, dec!(20));

        let updates = publisher.updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].symbol, "A");
        assert_eq!(updates[0].price, dec!(12));
        assert_eq!(updates[1].symbol, "B");
    }

    #[test]
    fn single_tick_passes_through() {
        let (aggregator, store, publisher) = aggregator();

        aggregator.handle(&[tick("AAPL", dec!(187.25))]);

        assert_eq!(store.get("AAPL").unwrap().price, dec!(187.25));
        assert_eq!(publisher.updates.lock().len(), 1);
    }

    #[test]
    fn stamp_is_ingestion_time_not_feed_time() {
        let (aggregator, store, _) = aggregator();
        let before = chrono::Utc::now().timestamp_millis();

        // The feed-reported timestamp (0) must not leak into the record.
        aggregator.handle(&[tick("AAPL", dec!(1))]);

        let after = chrono::Utc::now().timestamp_millis();
        let record = store.get("AAPL").unwrap();
        assert!(record.timestamp >= before && record.timestamp <= after);
    }

    #[test]
    fn batch_shares_one_stamp() {
        let (aggregator, store, _) = aggregator();

        aggregator.handle(&[tick("A", dec!(1)), tick("B", dec!(2))]);

        assert_eq!(
            store.get("A").unwrap().timestamp,
            store.get("B").unwrap().timestamp
        );
    }

    #[test]
    fn later_batches_overwrite_earlier_ones() {
        let (aggregator, store, publisher) = aggregator();

        aggregator.handle(&[tick("AAPL", dec!(100))]);
        aggregator.handle(&[tick("AAPL", dec!(101))]);

        assert_eq!(store.get("AAPL").unwrap().price, dec!(101));
        assert_eq!(publisher.updates.lock().len(), 2);
    }
}
