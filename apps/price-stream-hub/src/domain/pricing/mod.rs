//! Price Data Types and Latest-Price Store
//!
//! Core domain types for the tick pipeline: ephemeral ticks coming off the
//! upstream feed, the per-symbol latest-price record, and the update event
//! fanned out to downstream readers.
//!
//! # Design
//!
//! The store keeps exactly one `PriceRecord` per symbol, overwritten in
//! place. Last-write-wins is decided by arrival order from the single
//! upstream connection, not by the timestamp embedded in a tick.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// A symbol string identifying a tradable instrument. Case-sensitive.
pub type Symbol = String;

/// A single trade tick received from the upstream feed.
///
/// Ticks are ephemeral: they are reduced per batch and never persisted
/// individually.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Trade price.
    pub price: Decimal,
    /// Timestamp embedded in the tick, epoch milliseconds.
    pub timestamp: i64,
    /// Trade volume, when the feed provides it.
    pub volume: Option<Decimal>,
}

/// Latest known price for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Latest price.
    pub price: Decimal,
    /// Receipt time of the batch that produced this record, epoch ms.
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

/// Price update event published on the fan-out channel.
///
/// Carries the same content as the `PriceRecord` written in the same
/// logical step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Latest price.
    pub price: Decimal,
    /// Receipt time, epoch ms.
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

impl From<PriceRecord> for PriceUpdate {
    fn from(record: PriceRecord) -> Self {
        Self {
            symbol: record.symbol,
            price: record.price,
            timestamp: record.timestamp,
        }
    }
}

// =============================================================================
// Price Store
// =============================================================================

/// Shared latest-price store.
///
/// One record per symbol, overwrite-not-merge, no history. Written only by
/// the tick aggregator; read by any number of valuation/request tasks.
/// Querying a symbol that has never ticked is not an error.
#[derive(Debug, Default)]
pub struct PriceStore {
    records: RwLock<HashMap<Symbol, PriceRecord>>,
}

impl PriceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the latest record for a symbol, if it has ever ticked.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<PriceRecord> {
        self.records.read().get(symbol).cloned()
    }

    /// Overwrite the record for the symbol.
    pub fn write(&self, record: PriceRecord) {
        self.records.write().insert(record.symbol.clone(), record);
    }

    /// Number of symbols with a known price.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check whether no symbol has ticked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, price: i64, ts: i64) -> PriceRecord {
        PriceRecord {
            symbol: symbol.to_string(),
            price: Decimal::from(price),
            timestamp: ts,
        }
    }

    #[test]
    fn get_unknown_symbol_is_absent() {
        let store = PriceStore::new();
        assert!(store.get("AAPL").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn write_then_get_roundtrip() {
        let store = PriceStore::new();
        store.write(record("AAPL", 150, 1_000));

        let read = store.get("AAPL").unwrap();
        assert_eq!(read.price, Decimal::from(150));
        assert_eq!(read.timestamp, 1_000);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn write_overwrites_in_place() {
        let store = PriceStore::new();
        store.write(record("AAPL", 150, 1_000));
        store.write(record("AAPL", 152, 2_000));

        let read = store.get("AAPL").unwrap();
        assert_eq!(read.price, Decimal::from(152));
        assert_eq!(read.timestamp, 2_000);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn symbols_are_case_sensitive() {
        let store = PriceStore::new();
        store.write(record("aapl", 1, 0));

        assert!(store.get("AAPL").is_none());
        assert!(store.get("aapl").is_some());
    }

    #[test]
    fn update_from_record_keeps_fields() {
        let update = PriceUpdate::from(record("MSFT", 300, 42));
        assert_eq!(update.symbol, "MSFT");
        assert_eq!(update.price, Decimal::from(300));
        assert_eq!(update.timestamp, 42);
    }

    #[test]
    fn update_serializes_with_ts_field() {
        let json = serde_json::to_string(&PriceUpdate {
            symbol: "AAPL".to_string(),
            price: Decimal::new(15025, 2),
            timestamp: 1_700_000_000_000,
        })
        .unwrap();

        assert!(json.contains(r#""symbol":"AAPL""#));
        assert!(json.contains(r#""ts":1700000000000"#));
    }
}
