//! Domain Layer - Core pricing types and subscription state.
//!
//! This layer contains the core domain types for the price pipeline
//! with no transport dependencies.

/// Price data types and the latest-price store.
pub mod pricing;

/// Tracked-symbol registry.
pub mod registry;
