//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for the upstream feed and the fan-out channel.
pub mod ports;

/// Application services for subscription handling and tick aggregation.
pub mod services;
