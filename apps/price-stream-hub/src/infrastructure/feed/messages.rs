//! Feed Wire Message Types
//!
//! Wire format types for the upstream price feed WebSocket protocol. All
//! frames are JSON objects carrying a `type` discriminator.
//!
//! # Message Types
//!
//! ## Outbound (client -> server)
//! - `subscribe` / `unsubscribe`: symbol-level subscription control
//!
//! ## Inbound (server -> client)
//! - `trade`: batch of trade ticks
//! - `ping`: server liveness probe, answered with a pong frame
//! - `error`: error notification with a message string

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::Tick;

// =============================================================================
// Outbound Frames (Client -> Server)
// =============================================================================

/// Subscription control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Start delivery of ticks for a symbol
    Subscribe,
    /// Stop delivery of ticks for a symbol
    Unsubscribe,
}

/// Subscription control frame.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "subscribe", "symbol": "AAPL"}
/// {"type": "unsubscribe", "symbol": "AAPL"}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ControlFrame {
    /// Action: "subscribe" or "unsubscribe"
    #[serde(rename = "type")]
    pub action: ControlAction,

    /// Target symbol
    pub symbol: String,
}

impl ControlFrame {
    /// Create a subscribe frame.
    #[must_use]
    pub fn subscribe(symbol: &str) -> Self {
        Self {
            action: ControlAction::Subscribe,
            symbol: symbol.to_string(),
        }
    }

    /// Create an unsubscribe frame.
    #[must_use]
    pub fn unsubscribe(symbol: &str) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            symbol: symbol.to_string(),
        }
    }
}

// =============================================================================
// Inbound Frames (Server -> Client)
// =============================================================================

/// A single trade tick within a `trade` frame.
///
/// # Wire Format (JSON)
/// ```json
/// {"s": "AAPL", "p": 187.25, "t": 1700000000000, "v": 12}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TradeTick {
    /// Ticker symbol
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last trade price
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Feed-reported trade timestamp (epoch milliseconds)
    #[serde(rename = "t")]
    pub timestamp: i64,

    /// Trade volume, when the feed reports it
    #[serde(rename = "v", default)]
    pub volume: Option<Decimal>,
}

impl From<TradeTick> for Tick {
    fn from(tick: TradeTick) -> Self {
        Self {
            symbol: tick.symbol,
            price: tick.price,
            timestamp: tick.timestamp,
            volume: tick.volume,
        }
    }
}

/// Inbound feed message.
///
/// Frame types the feed may add in the future decode to [`Self::Unknown`]
/// rather than failing the whole frame.
///
/// # Wire Format (JSON)
/// ```json
/// {"type": "trade", "data": [{"s": "AAPL", "p": 187.25, "t": 1700000000000}]}
/// {"type": "ping"}
/// {"type": "error", "msg": "Subscribing to too many symbols"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    /// Batch of trade ticks
    Trade {
        /// Ticks in feed-delivery order
        data: Vec<TradeTick>,
    },

    /// Server liveness probe
    Ping,

    /// Error notification
    Error {
        /// Error description
        msg: String,
    },

    /// Unrecognized frame type
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn deserialize_trade_batch() {
        let json = r#"{
            "type": "trade",
            "data": [
                {"s": "AAPL", "p": 187.25, "t": 1700000000000, "v": 12},
                {"s": "MSFT", "p": 402.1, "t": 1700000000001}
            ]
        }"#;

        let msg: FeedMessage = serde_json::from_str(json).unwrap();
        let FeedMessage::Trade { data } = msg else {
            panic!("expected trade frame");
        };

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].symbol, "AAPL");
        assert_eq!(data[0].price, dec!(187.25));
        assert_eq!(data[0].volume, Some(dec!(12)));
        assert_eq!(data[1].symbol, "MSFT");
        assert_eq!(data[1].volume, None);
    }

    #[test]
    fn deserialize_ping() {
        let msg: FeedMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, FeedMessage::Ping);
    }

    #[test]
    fn deserialize_error() {
        let json = r#"{"type":"error","msg":"Subscribing to too many symbols"}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            FeedMessage::Error {
                msg: "Subscribing to too many symbols".to_string()
            }
        );
    }

    #[test]
    fn unknown_frame_type_does_not_fail() {
        let json = r#"{"type":"news","headline":"something"}"#;
        let msg: FeedMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, FeedMessage::Unknown);
    }

    #[test]
    fn serialize_subscribe_frame() {
        let frame = ControlFrame::subscribe("AAPL");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"subscribe","symbol":"AAPL"}"#);
    }

    #[test]
    fn serialize_unsubscribe_frame() {
        let frame = ControlFrame::unsubscribe("MSFT");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"unsubscribe","symbol":"MSFT"}"#);
    }

    #[test]
    fn tick_conversion_preserves_fields() {
        let tick = TradeTick {
            symbol: "TSLA".to_string(),
            price: dec!(242.5),
            timestamp: 1_700_000_000_000,
            volume: Some(dec!(3)),
        };

        let converted = Tick::from(tick);
        assert_eq!(converted.symbol, "TSLA");
        assert_eq!(converted.price, dec!(242.5));
        assert_eq!(converted.timestamp, 1_700_000_000_000);
        assert_eq!(converted.volume, Some(dec!(3)));
    }
}
