//! Upstream Feed Connector
//!
//! WebSocket client for the upstream price feed. Maintains exactly one
//! connection, restores subscriptions after every reconnect, and hands
//! decoded trade batches to the tick aggregator.
//!
//! # Modules
//!
//! - [`messages`]: wire-format types for the upstream JSON protocol
//! - [`codec`]: JSON decode of inbound frames
//! - [`reconnect`]: linear backoff policy with rate-limit cooldown
//! - [`connector`]: connection lifecycle and session loop

pub mod codec;
pub mod connector;
pub mod messages;
pub mod reconnect;

pub use codec::{CodecError, JsonCodec};
pub use connector::{
    ConnectionState, FeedCommand, FeedConnector, FeedConnectorConfig, FeedError, FeedHandle,
    FeedStatus,
};
pub use messages::{ControlFrame, FeedMessage, TradeTick};
pub use reconnect::{BackoffConfig, BackoffPolicy};
